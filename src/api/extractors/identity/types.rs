/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - 認証 filter が request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - request ごとに作られ、request と一緒に捨てられる (共有・永続化しない)
 */
use std::collections::BTreeSet;

/// Identity established for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    pub subject: String,
    pub authorities: BTreeSet<String>,
}

impl IdentityContext {
    pub fn new(subject: impl Into<String>, authorities: BTreeSet<String>) -> Self {
        Self {
            subject: subject.into(),
            authorities,
        }
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }
}
