//! Listing renderers.

use std::fmt::{self, Write};

use super::HandlerError;
use super::listing::{EntryType, Listing};

/// Rendered bytes plus the `Content-Type` to send them with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub body: Vec<u8>,
    pub content_type: &'static str,
}

/// Turns a [`Listing`] into a response body.
pub trait Render: Send + Sync {
    /// # Errors
    ///
    /// Returns [`HandlerError`] if the listing cannot be serialized or written.
    fn render(&self, listing: &Listing) -> Result<Rendered, HandlerError>;
}

/// Serializes the listing as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Render for JsonRenderer {
    fn render(&self, listing: &Listing) -> Result<Rendered, HandlerError> {
        Ok(Rendered {
            body: serde_json::to_vec(listing)?,
            content_type: "application/json; charset=utf-8",
        })
    }
}

/// A minimal HTML page: breadcrumbs followed by one link per entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl Render for HtmlRenderer {
    fn render(&self, listing: &Listing) -> Result<Rendered, HandlerError> {
        let mut html = String::with_capacity(512 + listing.files.len() * 96);
        write_page(&mut html, listing)?;
        Ok(Rendered {
            body: html.into_bytes(),
            content_type: "text/html; charset=utf-8",
        })
    }
}

fn write_page(html: &mut String, listing: &Listing) -> fmt::Result {
    write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Files within {}</title>\n</head>\n<body>\n<h1>",
        escape(&listing.directory)
    )?;
    for crumb in &listing.paths {
        write!(
            html,
            "<a href=\"{}\">{}</a>",
            escape(&crumb.url),
            escape(&crumb.name)
        )?;
    }
    html.push_str("</h1>\n<ul>\n");
    for file in &listing.files {
        let class = match file.kind {
            EntryType::Directory => "directory",
            EntryType::File => "file",
        };
        write!(
            html,
            "<li class=\"{class}\"><a href=\"{}\" title=\"{}\">{}</a>",
            escape(&file.relative),
            escape(&file.title),
            escape(&file.base)
        )?;
        if let Some(size) = &file.size {
            write!(html, " <span class=\"size\">{}</span>", escape(size))?;
        }
        html.push_str("</li>\n");
    }
    html.push_str("</ul>\n</body>\n</html>\n");
    Ok(())
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
