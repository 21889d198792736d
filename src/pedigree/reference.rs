//! Resolution of raw page references (bare ids or hrefs) to identifiers.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Horse,
    Jockey,
    Trainer,
    Owner,
    Breeder,
}

static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+$").expect("bare id pattern"));

// netkeiba person links carry a view segment (`result/recent/`, `prof/`)
// before the id; JBIS links do not.
static HORSE_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/horse/(?:ped/)?(\w+)").expect("horse href pattern"));
static JOCKEY_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/jockey/(?:result/recent/|prof/|result/)?(\w+)").expect("jockey href pattern")
});
static TRAINER_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/trainer/(?:result/recent/|prof/|result/)?(\w+)").expect("trainer href pattern")
});
static OWNER_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/owner/(?:result/recent/|prof/)?(\w+)").expect("owner href pattern")
});
static BREEDER_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/breeder/(?:result/recent/|prof/)?(\w+)").expect("breeder href pattern")
});

impl ReferenceKind {
    fn href_pattern(self) -> &'static Regex {
        match self {
            ReferenceKind::Horse => &HORSE_HREF,
            ReferenceKind::Jockey => &JOCKEY_HREF,
            ReferenceKind::Trainer => &TRAINER_HREF,
            ReferenceKind::Owner => &OWNER_HREF,
            ReferenceKind::Breeder => &BREEDER_HREF,
        }
    }
}

/// Identifier behind a raw reference, or `None` when it cannot be mapped.
pub fn resolve(kind: ReferenceKind, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if BARE_ID.is_match(raw) {
        return Some(raw.to_string());
    }
    kind.href_pattern()
        .captures(raw)
        .map(|caps| caps[1].to_string())
}

/// [`resolve`], failing with `UnresolvableReference`.
pub fn try_resolve(kind: ReferenceKind, raw: &str) -> SyncResult<String> {
    resolve(kind, raw).ok_or_else(|| {
        SyncError::UnresolvableReference(format!("{kind:?} reference {raw:?}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_resolve_error() {
        assert_eq!(try_resolve(ReferenceKind::Owner, "/owner/123/").unwrap(), "123");
        assert!(matches!(
            try_resolve(ReferenceKind::Owner, "/horse/123/"),
            Err(SyncError::UnresolvableReference(_))
        ));
    }

    #[test]
    fn test_bare_ids() {
        assert_eq!(resolve(ReferenceKind::Horse, "2019104308").as_deref(), Some("2019104308"));
        assert_eq!(resolve(ReferenceKind::Horse, " 000a01 ").as_deref(), Some("000a01"));
    }

    #[test]
    fn test_horse_hrefs() {
        assert_eq!(
            resolve(ReferenceKind::Horse, "https://www.jbis.or.jp/horse/0001237587/").as_deref(),
            Some("0001237587")
        );
        assert_eq!(
            resolve(ReferenceKind::Horse, "/horse/ped/2019104308/").as_deref(),
            Some("2019104308")
        );
    }

    #[test]
    fn test_person_hrefs() {
        assert_eq!(
            resolve(ReferenceKind::Jockey, "/jockey/result/recent/01170/").as_deref(),
            Some("01170")
        );
        assert_eq!(
            resolve(ReferenceKind::Trainer, "https://db.netkeiba.com/trainer/prof/01088/").as_deref(),
            Some("01088")
        );
        assert_eq!(resolve(ReferenceKind::Owner, "/owner/533800/").as_deref(), Some("533800"));
        assert_eq!(resolve(ReferenceKind::Breeder, "/breeder/373126/").as_deref(), Some("373126"));
    }

    #[test]
    fn test_unresolvable() {
        assert_eq!(resolve(ReferenceKind::Horse, ""), None);
        assert_eq!(resolve(ReferenceKind::Horse, "javascript:void(0)"), None);
        assert_eq!(resolve(ReferenceKind::Jockey, "/horse/2019104308/"), None);
    }
}
