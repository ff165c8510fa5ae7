//! Declarative column-role vocabulary shared by header detection, schema
//! reconciliation and the query engine.
//!
//! The upstream sheets are human-edited and bilingual, so the same logical
//! column shows up as "Ngày", "Ngày ban hành", "Date", "Thời gian", etc.
//! All of that knowledge lives in one static table; adding a language or a
//! role is additive, never a new scattered string check.

/// Semantic role a spreadsheet column can play.
///
/// Declaration order is the tie-break priority: a header that somehow
/// matches several roles resolves to the earliest one here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Issue/record date of the directive.
    Date,
    /// Free-text body of the directive.
    Content,
    /// Owning unit / focal point responsible for follow-up.
    Owner,
}

struct RoleKeywords {
    role: Role,
    keywords: &'static [&'static str],
}

/// Keyword table, in priority order (date > content > owner). Keywords are
/// matched as lowercase substrings of the header text.
static ROLE_TABLE: &[RoleKeywords] = &[
    RoleKeywords {
        role: Role::Date,
        keywords: &["ngày", "ngay", "date", "thời gian", "thoi gian", "time"],
    },
    RoleKeywords {
        role: Role::Content,
        keywords: &[
            "nội dung",
            "noi dung",
            "content",
            "chỉ đạo",
            "chi dao",
            "directive",
        ],
    },
    RoleKeywords {
        role: Role::Owner,
        keywords: &[
            "chủ trì",
            "chu tri",
            "đầu mối",
            "dau moi",
            "phụ trách",
            "phu trach",
            "focal",
            "owner",
            "đơn vị",
            "don vi",
        ],
    },
];

/// Resolve the semantic role of a header cell, if any.
pub fn role_of(header: &str) -> Option<Role> {
    let h = header.trim().to_lowercase();
    if h.is_empty() {
        return None;
    }
    for entry in ROLE_TABLE {
        if entry.keywords.iter().any(|kw| h.contains(kw)) {
            return Some(entry.role);
        }
    }
    None
}

/// `true` if `text` (already lowercased) contains any keyword of `role`.
/// Used by the header locator, which scores a whole joined row at once.
pub fn text_mentions_role(text: &str, role: Role) -> bool {
    ROLE_TABLE
        .iter()
        .filter(|entry| entry.role == role)
        .any(|entry| entry.keywords.iter().any(|kw| text.contains(kw)))
}

/// Column indexes of each role within a master schema, resolved once per
/// table so row accesses never re-sniff header text.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleIndex {
    pub date: Option<usize>,
    pub content: Option<usize>,
    pub owner: Option<usize>,
}

impl RoleIndex {
    /// Scan a schema (skipping the reserved provenance column 0) and bind
    /// each role to the first column claiming it.
    pub fn resolve(schema: &[String]) -> Self {
        let mut idx = RoleIndex::default();
        for (i, name) in schema.iter().enumerate().skip(1) {
            match role_of(name) {
                Some(Role::Date) if idx.date.is_none() => idx.date = Some(i),
                Some(Role::Content) if idx.content.is_none() => idx.content = Some(i),
                Some(Role::Owner) if idx.owner.is_none() => idx.owner = Some(i),
                _ => {}
            }
        }
        idx
    }

    pub fn get(&self, role: Role) -> Option<usize> {
        match role {
            Role::Date => self.date,
            Role::Content => self.content,
            Role::Owner => self.owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vietnamese_and_english_headers_resolve() {
        assert_eq!(role_of("Ngày ban hành"), Some(Role::Date));
        assert_eq!(role_of("DATE"), Some(Role::Date));
        assert_eq!(role_of("Nội dung chỉ đạo"), Some(Role::Content));
        assert_eq!(role_of("Đơn vị chủ trì"), Some(Role::Owner));
        assert_eq!(role_of("Focal point"), Some(Role::Owner));
        assert_eq!(role_of("STT"), None);
        assert_eq!(role_of(""), None);
    }

    #[test]
    fn priority_is_declaration_order() {
        // pathological header matching both date and content keywords
        assert_eq!(role_of("Ngày / nội dung"), Some(Role::Date));
    }

    #[test]
    fn role_index_binds_first_match_only() {
        let schema = vec![
            "Source_Year".to_string(),
            "Ngày".to_string(),
            "Nội dung".to_string(),
            "Ngày hoàn thành".to_string(),
            "Chủ trì".to_string(),
        ];
        let idx = RoleIndex::resolve(&schema);
        assert_eq!(idx.date, Some(1));
        assert_eq!(idx.content, Some(2));
        assert_eq!(idx.owner, Some(4));
    }
}
