//! WebDriver-backed [`DomCapability`] provider.
//!
//! Wraps a [`thirtyfour`] session against an already-running WebDriver
//! server (chromedriver, selenium-standalone). Launching the browser binary
//! is the caller's problem; this module only speaks the protocol.

use crate::dom::{DomCapability, DomError, ScriptArg};
use crate::error::ExtractError;
use async_trait::async_trait;
use thirtyfour::error::WebDriverError;
use thirtyfour::{By, DesiredCapabilities, WebDriver, WebElement};
use tracing::{debug, info};

impl From<WebDriverError> for DomError {
    fn from(e: WebDriverError) -> Self {
        DomError::new(e.to_string())
    }
}

/// A live WebDriver session exposed as a [`DomCapability`].
pub struct WebDriverDom {
    driver: WebDriver,
}

impl WebDriverDom {
    /// Connect to a WebDriver server and start a Chrome session.
    ///
    /// Cache-disabling arguments keep the virtualised renderer from serving
    /// stale block content across sessions.
    pub async fn connect(server_url: &str, headless: bool) -> Result<Self, ExtractError> {
        let mut caps = DesiredCapabilities::chrome();
        for arg in [
            "--disk-cache-size=0",
            "--media-cache-size=0",
            "--disable-gpu-shader-disk-cache",
        ] {
            caps.add_chrome_arg(arg)
                .map_err(|e| ExtractError::Session(e.to_string()))?;
        }
        if headless {
            caps.add_chrome_arg("--headless=new")
                .map_err(|e| ExtractError::Session(e.to_string()))?;
        }

        info!(server = server_url, headless, "connecting to WebDriver");
        let driver = WebDriver::new(server_url, caps)
            .await
            .map_err(|e| ExtractError::Session(e.to_string()))?;
        Ok(Self { driver })
    }

    /// Navigate to the document URL.
    pub async fn open(&self, url: &str) -> Result<(), ExtractError> {
        info!(url, "opening document");
        self.driver
            .goto(url)
            .await
            .map_err(|e| ExtractError::Session(e.to_string()))
    }

    /// End the browser session.
    pub async fn quit(self) -> Result<(), ExtractError> {
        self.driver
            .quit()
            .await
            .map_err(|e| ExtractError::Session(e.to_string()))
    }

    /// The underlying [`thirtyfour`] handle, for callers that need protocol
    /// operations this wrapper does not expose.
    pub fn driver(&self) -> &WebDriver {
        &self.driver
    }
}

#[async_trait]
impl DomCapability for WebDriverDom {
    type Node = WebElement;

    async fn query_all(
        &self,
        selector: &str,
        scope: Option<&Self::Node>,
    ) -> Result<Vec<Self::Node>, DomError> {
        let found = match scope {
            Some(node) => node.find_all(By::Css(selector)).await?,
            None => self.driver.find_all(By::Css(selector)).await?,
        };
        Ok(found)
    }

    async fn query_one(
        &self,
        selector: &str,
        scope: Option<&Self::Node>,
    ) -> Result<Option<Self::Node>, DomError> {
        // find() errors on no-match; an absent element is an ordinary
        // outcome here, so query the full list and take the head.
        let mut found = self.query_all(selector, scope).await?;
        if found.is_empty() {
            Ok(None)
        } else {
            Ok(Some(found.swap_remove(0)))
        }
    }

    async fn attribute(
        &self,
        node: &Self::Node,
        name: &str,
    ) -> Result<Option<String>, DomError> {
        Ok(node.get_attribute(name).await?)
    }

    async fn text(&self, node: &Self::Node) -> Result<String, DomError> {
        Ok(node.text().await?)
    }

    async fn computed_style(
        &self,
        node: &Self::Node,
        property: &str,
    ) -> Result<String, DomError> {
        Ok(node.css_value(property).await?)
    }

    async fn evaluate(
        &self,
        script: &str,
        args: Vec<ScriptArg<Self::Node>>,
    ) -> Result<serde_json::Value, DomError> {
        let mut json_args = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                ScriptArg::Node(node) => json_args.push(node.to_json()?),
                ScriptArg::Json(value) => json_args.push(value),
            }
        }
        let ret = self.driver.execute(script, json_args).await?;
        Ok(ret.json().clone())
    }

    async fn scroll_by(&self, origin: &Self::Node, dx: i64, dy: i64) -> Result<(), DomError> {
        debug!(dx, dy, "dispatching scroll gesture");
        self.driver
            .execute(
                "arguments[0].dispatchEvent(new WheelEvent('wheel', \
                 {deltaX: arguments[1], deltaY: arguments[2], bubbles: true}));",
                vec![
                    origin.to_json()?,
                    serde_json::Value::from(dx),
                    serde_json::Value::from(dy),
                ],
            )
            .await?;
        Ok(())
    }
}
