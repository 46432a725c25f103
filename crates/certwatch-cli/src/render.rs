//! Plain-text output for console commands

use certwatch_client::models::{FlaggedDataDetail, SearchSettingDetail, SearchSettingSummary};
use certwatch_client::{AssetMap, AssetStatus};
use certwatch_session::{Session, SessionState};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn session(session: &Session) {
    let role = match session.state() {
        SessionState::LoggedOut => {
            println!("Not logged in");
            return;
        }
        SessionState::LoggedInUser => "user",
        SessionState::LoggedInAdmin => "admin",
    };
    println!("User: {}", session.subject().unwrap_or("unknown"));
    println!("Role: {}", role);
}

pub fn settings(settings: &[SearchSettingSummary]) {
    if settings.is_empty() {
        println!("No search settings yet");
        return;
    }
    println!("{:<6} {:<16} {:<28} {:>8}", "ID", "OWNER", "DOMAIN", "FLAGGED");
    for setting in settings {
        println!(
            "{:<6} {:<16} {:<28} {:>8}",
            setting.id,
            setting.owner,
            format!("{}.{}", setting.domain_base, setting.tld),
            setting.flagged_data_count
        );
    }
}

pub fn setting_detail(setting: &SearchSettingDetail) {
    println!("Search setting {} ({}.{})", setting.id, setting.domain_base, setting.tld);
    println!("Owner: {}", setting.owner);
    if let Some(logo) = &setting.logo {
        println!("Logo: {}", logo.name);
    }
    if let Some(extra) = &setting.additional_settings {
        println!("Additional settings: {}", extra);
    }

    if setting.flagged_data.is_empty() {
        println!("No flagged domains");
        return;
    }
    println!();
    println!("{:<6} {:<32} {:<14} {:<17} {:>7}", "ID", "DOMAIN", "ALGORITHM", "FLAGGED", "IMAGES");
    for flagged in &setting.flagged_data {
        let marker = if flagged.suspected_logo { "*" } else { "" };
        println!(
            "{:<6} {:<32} {:<14} {:<17} {:>7}",
            flagged.id,
            format!("{}{}", flagged.domain, marker),
            flagged.algorithm,
            flagged.flagged_time.format(TIME_FORMAT),
            flagged.scraped_images_count
        );
    }
}

pub fn flagged_detail(detail: &FlaggedDataDetail, assets: &AssetMap) {
    println!("Flagged domain {} ({})", detail.domain, detail.id);
    println!("Resembles: {}", detail.searched_domain);
    println!("Algorithm: {}", detail.algorithm);
    println!("Flagged: {}", detail.flagged_time.format(TIME_FORMAT));
    println!("Scraped: {}", if detail.successfully_scraped { "yes" } else { "no" });
    if detail.suspected_logo {
        println!("Suspected logo match");
    }

    for scan in &detail.scan_history {
        println!(
            "  scan {} at {}{}",
            scan.id,
            scan.scan_time.format(TIME_FORMAT),
            scan.notes.as_deref().map(|n| format!(": {}", n)).unwrap_or_default()
        );
    }

    let images = detail.all_images();
    if images.is_empty() {
        println!("No images");
        return;
    }
    println!();
    for image in images {
        let status = match assets.get(image.id) {
            Some(AssetStatus::Ready(url)) => url.as_str().to_string(),
            Some(AssetStatus::NoSource) => "no stored copy".to_string(),
            Some(AssetStatus::Unavailable) => "[image unavailable]".to_string(),
            Some(AssetStatus::Pending) | None => "loading".to_string(),
        };
        println!("  {:<6} {:<24} {}", image.id, image.name, status);
    }
}
