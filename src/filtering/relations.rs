//! `with` expansion.
//!
//! `with` tokens are flattened on commas and read one dot deep:
//!
//! - `role` eager-loads `role`
//! - `tokens.count` counts `tokens`
//! - `posts.comments` loads `posts` and, for each post, `comments`
//!
//! Only the first two segments of a token are significant. The resulting
//! [`RelationPlan`] is executed as at most one batched count and one batched load.

/// A single parsed `with` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationDirective {
    Simple(String),
    Nested { name: String, relations: Vec<String> },
    Count(String),
}

impl RelationDirective {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Simple(name) | Self::Count(name) | Self::Nested { name, .. } => name,
        }
    }

    /// Sub-relations to load on the related rows
    #[must_use]
    pub fn nested(&self) -> &[String] {
        match self {
            Self::Nested { relations, .. } => relations,
            Self::Simple(_) | Self::Count(_) => &[],
        }
    }
}

/// Counts and loads requested by one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationPlan {
    pub counts: Vec<String>,
    pub relations: Vec<RelationDirective>,
}

impl RelationPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty() && self.relations.is_empty()
    }

    fn add_count(&mut self, name: String) {
        if !self.counts.contains(&name) {
            self.counts.push(name);
        }
    }

    /// Record a load, merging repeated mentions of the same relation.
    fn add_relation(&mut self, directive: RelationDirective) {
        let Some(existing) = self
            .relations
            .iter_mut()
            .find(|existing| existing.name() == directive.name())
        else {
            self.relations.push(directive);
            return;
        };

        let mut relations = existing.nested().to_vec();
        for nested in directive.nested() {
            if !relations.contains(nested) {
                relations.push(nested.clone());
            }
        }
        if !relations.is_empty() {
            *existing = RelationDirective::Nested {
                name: existing.name().to_string(),
                relations,
            };
        }
    }
}

/// Parse one comma-free token.
#[must_use]
pub fn parse_token(token: &str) -> Option<RelationDirective> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    let mut segments = token.split('.');
    let field = segments.next().unwrap_or_default().trim();
    let Some(prop) = segments.next().map(str::trim) else {
        return Some(RelationDirective::Simple(token.to_string()));
    };
    if segments.next().is_some() {
        tracing::warn!(token = token, "Relation token nests deeper than one level; extra segments ignored");
    }
    if field.is_empty() {
        return None;
    }

    if prop == "count" {
        return Some(RelationDirective::Count(field.to_string()));
    }

    let relations: Vec<String> = prop
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    if relations.is_empty() {
        Some(RelationDirective::Simple(field.to_string()))
    } else {
        Some(RelationDirective::Nested {
            name: field.to_string(),
            relations,
        })
    }
}

/// Expand raw `with` values into a [`RelationPlan`].
pub fn expand<I, S>(tokens: I) -> RelationPlan
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut plan = RelationPlan::default();
    for value in tokens {
        for token in value.as_ref().split(',') {
            match parse_token(token) {
                Some(RelationDirective::Count(name)) => plan.add_count(name),
                Some(directive) => plan.add_relation(directive),
                None => {}
            }
        }
    }
    plan
}
