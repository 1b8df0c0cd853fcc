//! PlantUML server client for image output.
//!
//! The server renders a diagram from its hex-encoded source:
//! `GET {server}/{format}/~h{hex}`.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info};

use crate::config::OutputFormat;
use crate::error::ServerError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Image formats the PlantUML server can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Svg,
    Png,
    Txt,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
            ImageFormat::Txt => "txt",
        }
    }

    /// Determine the image format from an output path's extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "svg" => Some(ImageFormat::Svg),
            "png" => Some(ImageFormat::Png),
            "txt" => Some(ImageFormat::Txt),
            _ => None,
        }
    }

    pub fn for_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Lowercase hex of the UTF-8 bytes, prefixed with the `~h` marker.
pub fn encode_hex(text: &str) -> String {
    format!("~h{}", hex::encode(text))
}

/// Full request URL for a diagram.
pub fn image_url(server: &str, image: ImageFormat, text: &str) -> String {
    format!(
        "{}/{}/{}",
        server.trim_end_matches('/'),
        image.as_str(),
        encode_hex(text)
    )
}

async fn fetch(client: &Client, url: &str) -> Result<Vec<u8>, ServerError> {
    let response = client.get(url).timeout(REQUEST_TIMEOUT).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ServerError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response.bytes().await?.to_vec())
}

/// Ask the server to render `text` and return the image bytes.
pub fn render_image(
    server: &str,
    format: OutputFormat,
    image: ImageFormat,
    text: &str,
) -> Result<Vec<u8>, ServerError> {
    if format != OutputFormat::PlantUml {
        return Err(ServerError::MermaidImage);
    }
    let url = image_url(server, image, text);
    debug!(url_len = url.len(), "requesting diagram image");

    let client = Client::builder().build()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ServerError::Runtime)?;
    let bytes = runtime.block_on(async { fetch(&client, &url).await })?;
    info!(bytes = bytes.len(), format = image.as_str(), "received diagram image");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_encode_hex() {
        assert_eq!(encode_hex("@startuml"), "~h407374617274756d6c");
        assert_eq!(encode_hex(""), "~h");
        assert_eq!(encode_hex("é"), "~hc3a9");
    }

    #[test]
    fn test_image_url() {
        assert_eq!(
            image_url("https://www.plantuml.com/plantuml/", ImageFormat::Svg, "A"),
            "https://www.plantuml.com/plantuml/svg/~h41"
        );
    }

    #[test]
    fn test_image_format_from_path() {
        assert_eq!(ImageFormat::for_path(&PathBuf::from("out/diagram.svg")), Some(ImageFormat::Svg));
        assert_eq!(ImageFormat::for_path(&PathBuf::from("diagram.PNG")), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::for_path(&PathBuf::from("diagram.txt")), Some(ImageFormat::Txt));
        assert_eq!(ImageFormat::for_path(&PathBuf::from("diagram.puml")), None);
        assert_eq!(ImageFormat::for_path(&PathBuf::from("diagram")), None);
    }

    #[test]
    fn test_mermaid_cannot_be_rendered_by_server() {
        let result = render_image(
            "http://127.0.0.1:9",
            OutputFormat::Mermaid,
            ImageFormat::Svg,
            "classDiagram",
        );
        assert!(matches!(result, Err(ServerError::MermaidImage)));
    }
}
