use serde::Serialize;
use url::{Url, form_urlencoded};

/// Skins the switcher knows about, as `(id, label)` in menu order
pub const SKINS: [(&str, &str); 7] = [
    ("vector", "Vector"),
    ("monobook", "MonoBook"),
    ("modern", "Modern"),
    ("minerva", "Minerva"),
    ("minervaneue", "MinervaNeue"),
    ("cologneblue", "CologneBlue"),
    ("apioutput", "ApiOutput"),
];

/// Query parameter MediaWiki reads to override the skin for one request
const SKIN_PARAM: &str = "useskin";

/// One entry of the switcher menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkinLink {
    pub skin: String,
    pub label: String,
    pub href: String,
    pub title: String,
}

/// Where the menu goes for a given skin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Cloned from the toolbox portlet in the sidebar
    Toolbox,
    /// A flat list across the top of the content area
    Header,
}

pub fn is_known(skin: &str) -> bool {
    SKINS.iter().any(|(id, _)| *id == skin)
}

pub fn placement(current_skin: &str) -> Option<Placement> {
    match current_skin {
        "vector" | "monobook" | "modern" | "cologneblue" => Some(Placement::Toolbox),
        "minerva" | "minervaneue" | "apioutput" => Some(Placement::Header),
        _ => None,
    }
}

/// The whole menu for one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkinMenu {
    pub placement: Option<Placement>,
    pub links: Vec<SkinLink>,
}

/// `page` with any fragment dropped and `useskin` set to `skin`.
///
/// The rest of the query is kept byte for byte.
pub fn skin_url(page: &Url, skin: &str) -> Url {
    let mut url = page.clone();
    url.set_fragment(None);

    let mut query = page
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty() && pair.split('=').next() != Some(SKIN_PARAM))
        .collect::<Vec<_>>()
        .join("&");
    if !query.is_empty() {
        query.push('&');
    }
    query.push_str(SKIN_PARAM);
    query.push('=');
    query.extend(form_urlencoded::byte_serialize(skin.as_bytes()));

    url.set_query(Some(&query));
    url
}

/// Placement and links for `page` shown in `current_skin`
pub fn menu(page: &Url, current_skin: &str) -> SkinMenu {
    SkinMenu {
        placement: placement(current_skin),
        links: links(page, current_skin),
    }
}

/// Links for every known skin except `current_skin`.
///
/// Unknown skins get no menu at all.
pub fn links(page: &Url, current_skin: &str) -> Vec<SkinLink> {
    if !is_known(current_skin) {
        ::log::debug!("Skin {} not supported, no switcher", current_skin);
        return Vec::new();
    }

    SKINS
        .iter()
        .filter(|(id, _)| *id != current_skin)
        .map(|(id, label)| SkinLink {
            skin: id.to_string(),
            label: label.to_string(),
            href: skin_url(page, id).to_string(),
            title: format!("View this page in {} skin", label),
        })
        .collect()
}
