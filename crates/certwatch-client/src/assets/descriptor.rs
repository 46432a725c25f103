use urlencoding::encode;

pub type ResourceId = i64;

/// Identifies a fetchable image without holding its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub id: ResourceId,
    pub storage_path: Option<String>,
    pub display_name: String,
    pub format: String,
}

impl ResourceDescriptor {
    pub fn new(
        id: ResourceId,
        storage_path: Option<String>,
        display_name: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            id,
            storage_path,
            display_name: display_name.into(),
            format: format.into(),
        }
    }

    pub fn is_fetchable(&self) -> bool {
        self.storage_path
            .as_deref()
            .is_some_and(|path| !path.is_empty())
    }

    /// `/files/<path>/<name>.<format>` with every component percent-encoded and
    /// the format lower-cased. `None` when there is no storage path.
    pub fn locator(&self) -> Option<String> {
        let path = self.storage_path.as_deref().filter(|p| !p.is_empty())?;
        let format = self.format.trim().to_lowercase();

        let mut locator = format!("/files/{}/{}", encode(path), encode(&self.display_name));
        if !format.is_empty() {
            locator.push('.');
            locator.push_str(&encode(&format));
        }
        Some(locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_encodes_components() {
        let descriptor = ResourceDescriptor::new(1, Some("alice/scan 7".into()), "logo#1", "JPEG");

        assert_eq!(
            descriptor.locator().as_deref(),
            Some("/files/alice%2Fscan%207/logo%231.jpeg")
        );
    }

    #[test]
    fn test_missing_storage_path_is_not_fetchable() {
        let none = ResourceDescriptor::new(1, None, "x", "png");
        let empty = ResourceDescriptor::new(2, Some(String::new()), "x", "png");

        assert!(!none.is_fetchable());
        assert!(!empty.is_fetchable());
        assert_eq!(none.locator(), None);
        assert_eq!(empty.locator(), None);
    }

    #[test]
    fn test_whitespace_storage_path_is_still_fetched() {
        let blank = ResourceDescriptor::new(4, Some("  ".into()), "x", "png");

        assert!(blank.is_fetchable());
        assert_eq!(blank.locator().as_deref(), Some("/files/%20%20/x.png"));
    }

    #[test]
    fn test_empty_format_omits_extension() {
        let descriptor = ResourceDescriptor::new(3, Some("bob".into()), "raw", "");

        assert_eq!(descriptor.locator().as_deref(), Some("/files/bob/raw"));
    }
}
