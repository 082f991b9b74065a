use crate::base::consenterror::ConsentError;
use url::Url;

/// The page the widget runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    url: Url,
    user_agent: String,
}

impl PageContext {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            user_agent: String::new(),
        }
    }

    pub fn parse(url: &str) -> Result<Self, ConsentError> {
        Ok(Self::new(Url::parse(url)?))
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Path plus query string, as analytics "document path" expects.
    pub fn path_and_query(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }

    /// Resolve `path` against the page URL.
    pub fn resolve(&self, path: &str) -> Result<Url, ConsentError> {
        Ok(self.url.join(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_parts() {
        let page = PageContext::parse("https://shop.example/cart?step=2#top")
            .unwrap()
            .with_user_agent("Mozilla/5.0");

        assert_eq!(page.host(), "shop.example");
        assert_eq!(page.path_and_query(), "/cart?step=2");
        assert_eq!(page.user_agent(), "Mozilla/5.0");
        assert_eq!(
            page.resolve("/cookieconsent").unwrap().as_str(),
            "https://shop.example/cookieconsent"
        );
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            PageContext::parse("not a url"),
            Err(ConsentError::InvalidUrl(_))
        ));
    }
}
