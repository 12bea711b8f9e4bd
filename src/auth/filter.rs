//! Search filter templates with a single `%s` placeholder.
//!
//! `%%` stands for a literal percent sign. Any other `%` directive is rejected
//! so a template can't silently swallow the username.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template has no %s placeholder")]
    MissingPlaceholder,

    #[error("template has more than one %s placeholder")]
    MultiplePlaceholders,

    #[error("unsupported directive %{0}")]
    UnknownDirective(char),

    #[error("template ends with a lone %")]
    TrailingPercent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterTemplate {
    prefix: String,
    suffix: String,
}

impl FilterTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut seen_placeholder = false;

        let mut chars = template.chars();
        while let Some(c) = chars.next() {
            let out = if seen_placeholder { &mut suffix } else { &mut prefix };
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('%') => out.push('%'),
                Some('s') if seen_placeholder => return Err(TemplateError::MultiplePlaceholders),
                Some('s') => seen_placeholder = true,
                Some(other) => return Err(TemplateError::UnknownDirective(other)),
                None => return Err(TemplateError::TrailingPercent),
            }
        }

        if !seen_placeholder {
            return Err(TemplateError::MissingPlaceholder);
        }

        Ok(Self { prefix, suffix })
    }

    /// Substitute an already-escaped value.
    pub fn render(&self, escaped: &str) -> String {
        let mut filter = String::with_capacity(self.prefix.len() + escaped.len() + self.suffix.len());
        filter.push_str(&self.prefix);
        filter.push_str(escaped);
        filter.push_str(&self.suffix);
        filter
    }
}

pub fn validate_template(template: &str) -> Result<(), TemplateError> {
    FilterTemplate::parse(template).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template() {
        let template = FilterTemplate::parse("(uid=%s)").unwrap();
        assert_eq!(template.render("jdoe"), "(uid=jdoe)");
    }

    #[test]
    fn test_compound_template() {
        let template = FilterTemplate::parse("(&(objectClass=inetOrgPerson)(|(uid=%s)))").unwrap();
        assert_eq!(
            template.render("jdoe"),
            "(&(objectClass=inetOrgPerson)(|(uid=jdoe)))"
        );
    }

    #[test]
    fn test_literal_percent() {
        let template = FilterTemplate::parse("(&(description=100%%)(uid=%s))").unwrap();
        assert_eq!(template.render("a"), "(&(description=100%)(uid=a))");
    }

    #[test]
    fn test_invalid_templates() {
        assert_eq!(FilterTemplate::parse("(uid=jdoe)"), Err(TemplateError::MissingPlaceholder));
        assert_eq!(
            FilterTemplate::parse("(|(uid=%s)(mail=%s))"),
            Err(TemplateError::MultiplePlaceholders)
        );
        assert_eq!(FilterTemplate::parse("(uid=%d)"), Err(TemplateError::UnknownDirective('d')));
        assert_eq!(FilterTemplate::parse("(uid=%s)%"), Err(TemplateError::TrailingPercent));
    }

    #[test]
    fn test_rendered_value_is_not_reinterpreted() {
        let template = FilterTemplate::parse("(uid=%s)").unwrap();
        assert_eq!(template.render("%s%%"), "(uid=%s%%)");
    }
}
