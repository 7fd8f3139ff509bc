//! Path to page resolution and page metadata.

use std::fmt;

use proto::DEFAULT_LOADING_TEXT;
use serde::{Deserialize, Serialize};

/// Top-level page of the application
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Main,
    Chat,
    Admin,
    Connections,
    Notebooks,
    Files,
    Settings,
    Demo,
    Docs,
    Community,
    Analytics,
    /// Any other first path segment.
    Other(String),
}

const PREFIXES: [(&str, Page); 10] = [
    ("/chat", Page::Chat),
    ("/admin", Page::Admin),
    ("/connections", Page::Connections),
    ("/notebooks", Page::Notebooks),
    ("/files", Page::Files),
    ("/settings", Page::Settings),
    ("/demo", Page::Demo),
    ("/docs", Page::Docs),
    ("/community", Page::Community),
    ("/analytics", Page::Analytics),
];

impl Page {
    /// Resolves the page a path belongs to.
    pub fn from_path(path: &str) -> Self {
        if path == "/" {
            return Self::Main;
        }
        if let Some((_, page)) = PREFIXES.iter().find(|(prefix, _)| path.starts_with(prefix)) {
            return page.clone();
        }
        match segments(path).next() {
            Some(first) => Self::Other(first.to_string()),
            None => Self::Main,
        }
    }

    /// Stable identifier, equal to the first path segment.
    pub fn id(&self) -> &str {
        match self {
            Self::Main => "main",
            Self::Chat => "chat",
            Self::Admin => "admin",
            Self::Connections => "connections",
            Self::Notebooks => "notebooks",
            Self::Files => "files",
            Self::Settings => "settings",
            Self::Demo => "demo",
            Self::Docs => "docs",
            Self::Community => "community",
            Self::Analytics => "analytics",
            Self::Other(id) => id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Main => "What do you want to analyze today?",
            Self::Chat => "Chat with Vikki",
            Self::Admin => "Admin Dashboard",
            Self::Connections => "Data Connections",
            Self::Notebooks => "Notebooks",
            Self::Files => "Files",
            Self::Settings => "Settings",
            Self::Demo => "UI Demo",
            Self::Docs => "Documentation",
            Self::Community => "Community",
            Self::Analytics => "Analytics",
            Self::Other(_) => "Vikki ChatBot",
        }
    }

    pub fn subtitle(&self) -> &str {
        match self {
            Self::Main => "Your AI-powered data analysis platform",
            Self::Chat => "Your intelligent assistant is ready to help",
            Self::Admin => "System administration and management",
            Self::Connections => "Manage your data sources and integrations",
            Self::Notebooks => "Create and manage analysis notebooks",
            Self::Files => "Upload and manage your files",
            Self::Settings => "Configure your preferences",
            Self::Demo => "Explore UI components and design system",
            Self::Docs => "Learn how to use Vikki ChatBot",
            Self::Community => "Connect with other users",
            Self::Analytics => "View usage analytics and insights",
            Self::Other(_) => "AI-powered chatbot for your business",
        }
    }

    /// Label shown while navigating to this page.
    pub fn loading_text(&self) -> &str {
        match self {
            Self::Main => "Loading Home...",
            Self::Chat => "Loading Chat Interface...",
            Self::Notebooks => "Loading Notebooks...",
            Self::Files => "Loading File Manager...",
            Self::Connections => "Loading Data Connections...",
            Self::Settings => "Loading Settings...",
            Self::Demo => "Loading Demo...",
            Self::Admin => "Loading Admin Dashboard...",
            _ => DEFAULT_LOADING_TEXT,
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Human-readable name of one path segment.
pub fn display_name(segment: &str) -> String {
    let known = match segment {
        "chat" => "Chat Threads",
        "admin" => "Admin Dashboard",
        "connections" => "Data Connections",
        "notebooks" => "Notebooks",
        "files" => "Files",
        "settings" => "Settings",
        "demo" => "UI Demo",
        "docs" => "Documentation",
        "community" => "Community",
        "analytics" => "Analytics",
        _ => {
            let mut chars = segment.chars();
            return match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            };
        }
    };
    known.to_string()
}

/// `["Home", <display name of each segment>...]`
pub fn breadcrumbs(path: &str) -> Vec<String> {
    std::iter::once("Home".to_string())
        .chain(segments(path).map(display_name))
        .collect()
}

/// Whether `target` is the current location or one of its ancestors.
/// The root only matches itself.
pub fn is_path_active(current: &str, target: &str) -> bool {
    if target == "/" {
        current == "/"
    } else {
        current.starts_with(target)
    }
}
