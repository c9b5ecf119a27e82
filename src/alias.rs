//! Site-alias parsing and tenant-name normalization.
//!
//! A site alias looks like `"Dhaka-12 (GP, Robi)"`: the bare site name, then
//! the tenants hosted at that site in parentheses.
use crate::config::TenantConfig;
use crate::types::TenantKey;
use crate::util::squash_whitespace;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

// Long-form carrier names seen in portal exports and prior-period summaries.
static DEFAULT_TENANT_ALIASES: Lazy<BTreeMap<String, String>> = Lazy::new(|| {
    [
        ("GRAMEENPHONE", "GP"),
        ("GRAMEEN PHONE", "GP"),
        ("GRAMEENPHONE LTD", "GP"),
        ("BANGLALINK", "BL"),
        ("BANGLALINK DIGITAL COMMUNICATIONS", "BL"),
        ("ROBI AXIATA", "ROBI"),
        ("AIRTEL", "ROBI"),
        ("TELETALK", "TT"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteAlias {
    pub site: String,
    /// Raw tenant names in alias order, trimmed and de-duplicated.
    /// Empty means the record cannot be attributed to any tenant.
    pub tenants: Vec<String>,
}

/// Split a composite alias into site name and tenant list.
///
/// The site name is the text before the first unescaped `(`; `\(` is kept as
/// a literal parenthesis. An unclosed group runs to the end of the string.
pub fn parse_site_alias(raw: &str) -> SiteAlias {
    let mut site = String::new();
    let mut chars = raw.chars().peekable();
    let mut group: Option<String> = None;

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'(') => {
                site.push('(');
                chars.next();
            }
            '(' => {
                group = Some(chars.by_ref().take_while(|c| *c != ')').collect());
                break;
            }
            _ => site.push(c),
        }
    }

    let mut tenants: Vec<String> = Vec::new();
    if let Some(group) = group {
        for name in group.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if !tenants.iter().any(|t| t == name) {
                tenants.push(name.to_string());
            }
        }
    }

    SiteAlias {
        site: site.trim().to_string(),
        tenants,
    }
}

/// Reduce a site name to the code used to join alarm rows with the inventory.
///
/// Removes every `_X` marker some alarm exports insert (case-sensitive, so a
/// lowercase `_x` stays), then keeps the first whitespace-separated token,
/// cuts at `(` and upper-cases.
pub fn clean_site_code(site: &str) -> String {
    let stripped = site.replace("_X", "");
    let token = stripped.split_whitespace().next().unwrap_or("");
    let token = token.split('(').next().unwrap_or("");
    token.trim().to_uppercase()
}

/// Maps tenant spellings onto one canonical join key.
#[derive(Debug, Clone)]
pub struct TenantNormalizer {
    aliases: BTreeMap<String, String>,
}

impl Default for TenantNormalizer {
    fn default() -> Self {
        Self {
            aliases: DEFAULT_TENANT_ALIASES.clone(),
        }
    }
}

impl TenantNormalizer {
    pub fn from_config(config: &TenantConfig) -> Self {
        let mut aliases = if config.replace_defaults {
            BTreeMap::new()
        } else {
            DEFAULT_TENANT_ALIASES.clone()
        };
        for (from, to) in &config.aliases {
            aliases.insert(fold(from), fold(to));
        }
        Self { aliases }
    }

    /// Returns `None` for names that are blank after trimming.
    pub fn normalize(&self, raw: &str) -> Option<TenantKey> {
        let folded = fold(raw);
        if folded.is_empty() {
            return None;
        }
        let canonical = self.aliases.get(&folded).cloned().unwrap_or(folded);
        Some(TenantKey::new(canonical))
    }

    /// Normalize every tenant of a parsed alias, dropping duplicates that only
    /// differ in spelling.
    pub fn normalize_all(&self, names: &[String]) -> Vec<TenantKey> {
        let mut keys: Vec<TenantKey> = Vec::with_capacity(names.len());
        for key in names.iter().filter_map(|n| self.normalize(n)) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

fn fold(s: &str) -> String {
    squash_whitespace(s).to_uppercase()
}
