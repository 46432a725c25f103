use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use certwatch_client::models::{LogoUpload, NewSearchSetting};
use certwatch_client::{ApiClient, AssetResolver, AssetStatus, AuthFlow, ResourceDescriptor};
use certwatch_session::session::install_global;
use certwatch_session::{FileTokenStore, GuardDecision, Route, SessionManager};
use certwatch_shared::AppConfig;
use tracing::{debug, info};

use crate::render;

/// Command handlers sharing one session, API client and image resolver.
pub struct Console {
    session: Arc<SessionManager>,
    api: Arc<ApiClient>,
    auth: AuthFlow,
    assets: AssetResolver,
}

impl Console {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let store = Arc::new(FileTokenStore::new(&config.session.token_dir));
        let session = install_global(SessionManager::new(store));
        session.initialize();

        let api = Arc::new(
            ApiClient::new(&config.api, session.clone()).context("building the HTTP client")?,
        );
        let auth = AuthFlow::new(api.clone(), session.clone());
        let assets = AssetResolver::new(api.clone());

        Ok(Self {
            session,
            api,
            auth,
            assets,
        })
    }

    /// Check the route guard before any request goes out.
    fn enter(&self, route: Route) -> anyhow::Result<()> {
        let session = self.session.current_session();
        match route.check(&session) {
            GuardDecision::Allow => {
                debug!("Entering {}", route);
                Ok(())
            }
            GuardDecision::Redirect { to, from } => {
                if session.is_authenticated() {
                    bail!("{} requires an admin account (redirected to {})", from, to)
                }
                bail!("{} requires a login, run `certwatch login` first (redirected to {})", from, to)
            }
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> anyhow::Result<()> {
        self.enter(Route::Login)?;
        let session = self.auth.login(username, password).await?;
        if session.is_authenticated() {
            println!("Logged in as {}", session.subject().unwrap_or(username));
            render::session(&session);
        } else {
            println!("The server accepted the credentials but its token could not be read.");
            println!("You are still logged out; check that the API URL points at a Certwatch backend.");
        }
        Ok(())
    }

    pub async fn signup(&self, username: &str, password: &str) -> anyhow::Result<()> {
        self.enter(Route::Signup)?;
        let message = self.auth.signup(username, password).await?;
        println!("{}", message);
        Ok(())
    }

    pub fn logout(&self) {
        self.auth.logout();
        println!("Logged out");
    }

    pub fn whoami(&self) {
        render::session(&self.session.current_session());
    }

    pub async fn list_settings(&self) -> anyhow::Result<()> {
        self.enter(Route::Home)?;
        let settings = self.api.list_search_settings().await?;
        render::settings(&settings);
        Ok(())
    }

    pub async fn show_setting(&self, id: i64) -> anyhow::Result<()> {
        self.enter(Route::SettingDetail(id))?;
        let setting = self.api.get_search_setting(id).await?;
        render::setting_detail(&setting);
        Ok(())
    }

    pub async fn create_setting(
        &self,
        domain_base: String,
        tld: String,
        additional_settings: Option<String>,
        logo: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        self.enter(Route::Home)?;

        let additional_settings = additional_settings
            .map(|raw| serde_json::from_str::<serde_json::Value>(&raw))
            .transpose()
            .context("--additional-settings must be valid JSON")?;
        let logo = match logo {
            Some(path) => Some(LogoUpload::read(&path).await?),
            None => None,
        };

        let message = self
            .api
            .create_search_setting(NewSearchSetting {
                domain_base,
                tld,
                additional_settings,
                logo,
            })
            .await?;
        println!("{}", message.message);
        Ok(())
    }

    pub async fn delete_setting(&self, id: i64) -> anyhow::Result<()> {
        self.enter(Route::SettingDetail(id))?;
        self.api.delete_search_setting(id).await?;
        println!("Deleted search setting {}", id);
        Ok(())
    }

    pub async fn show_flagged(&self, id: i64) -> anyhow::Result<()> {
        self.enter(Route::FlaggedDetail(id))?;
        let detail = self.api.get_flagged_data(id).await?;
        let descriptors: Vec<ResourceDescriptor> =
            detail.all_images().into_iter().map(ResourceDescriptor::from).collect();
        let assets = self.assets.resolve(&descriptors).await;
        render::flagged_detail(&detail, &assets);
        Ok(())
    }

    /// Download every stored image of a flagged domain into `out`.
    pub async fn save_flagged_images(&self, id: i64, out: &Path) -> anyhow::Result<()> {
        self.enter(Route::FlaggedDetail(id))?;
        let detail = self.api.get_flagged_data(id).await?;
        let descriptors: Vec<ResourceDescriptor> =
            detail.all_images().into_iter().map(ResourceDescriptor::from).collect();
        let assets = self.assets.resolve(&descriptors).await;

        tokio::fs::create_dir_all(out)
            .await
            .with_context(|| format!("creating {}", out.display()))?;

        let mut saved = 0;
        for descriptor in &descriptors {
            match assets.get(descriptor.id) {
                Some(AssetStatus::Ready(url)) => {
                    let Some(bytes) = self.assets.open(url) else {
                        continue;
                    };
                    let target = out.join(file_name(descriptor));
                    tokio::fs::write(&target, &bytes)
                        .await
                        .with_context(|| format!("writing {}", target.display()))?;
                    println!("  saved    {}", target.display());
                    saved += 1;
                }
                Some(AssetStatus::NoSource) => {
                    println!("  skipped  image {} has no stored copy", descriptor.id)
                }
                _ => println!("  failed   image {} is unavailable", descriptor.id),
            }
        }

        info!("Saved {} of {} images for flagged domain {}", saved, descriptors.len(), id);
        println!("{} of {} images saved", saved, descriptors.len());
        Ok(())
    }

    pub async fn admin_overview(&self) -> anyhow::Result<()> {
        self.enter(Route::Admin)?;
        render::session(&self.session.current_session());
        let settings = self.api.list_search_settings().await?;
        render::settings(&settings);
        Ok(())
    }
}

fn file_name(descriptor: &ResourceDescriptor) -> String {
    let stem = format!("{}-{}", descriptor.id, descriptor.display_name.replace(['/', '\\'], "_"));
    if descriptor.format.is_empty() {
        stem
    } else {
        format!("{}.{}", stem, descriptor.format.to_lowercase())
    }
}
