// src/units/template.rs

//! `{placeholder}` substitution for phase commands.

use std::collections::BTreeMap;

/// Values substituted into command templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholders {
    pub name: String,
    pub env: String,
    pub namespace: String,
    pub tag: String,
    pub path: String,
}

impl Placeholders {
    /// Replace every known `{key}` in `template`. Unknown placeholders and
    /// unbalanced braces are left as written.
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}').and_then(|close| self.lookup(&after[..close]).map(|v| (close, v))) {
                Some((close, value)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        match key {
            "name" => Some(&self.name),
            "env" => Some(&self.env),
            "namespace" => Some(&self.namespace),
            "tag" => Some(&self.tag),
            "path" => Some(&self.path),
            _ => None,
        }
    }

    /// Variables exported to every command of the unit.
    pub fn env_vars(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("ROLLOUT_UNIT".to_string(), self.name.clone()),
            ("ENV".to_string(), self.env.clone()),
            ("NAMESPACE".to_string(), self.namespace.clone()),
            ("TAG".to_string(), self.tag.clone()),
        ])
    }
}
