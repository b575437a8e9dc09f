use crate::dom::PathSegment;
use locus_common::LocatorKind;
use locus_common::locator::{css_string, css_text, is_css_identifier, xpath_literal};
use std::fmt;

/// Which generation strategy produced a candidate.
///
/// Ordered by priority: `Attribute` beats `Text` beats `Structural`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strategy {
    Attribute,
    Text,
    Structural,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Attribute, Strategy::Text, Strategy::Structural];

    /// Lower is better.
    pub fn priority(&self) -> u8 {
        match self {
            Strategy::Attribute => 0,
            Strategy::Text => 1,
            Strategy::Structural => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Attribute => "attribute",
            Strategy::Text => "text",
            Strategy::Structural => "structural",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a candidate locator addresses. The strategy is a function of the
/// anchor, so a candidate can never claim a strategy it did not come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    TestId { attr: String, value: String },
    Id(String),
    Name { tag: String, value: String },
    /// Explicit role plus accessible name. `via_aria` is set when the name
    /// comes from `aria-label`, otherwise it is matched as visible text.
    RoleName {
        role: String,
        name: String,
        via_aria: bool,
    },
    TagClasses { tag: String, classes: Vec<String> },
    Text { tag: String, text: String },
    Position(Vec<PathSegment>),
}

impl Anchor {
    pub fn strategy(&self) -> Strategy {
        match self {
            Anchor::TestId { .. }
            | Anchor::Id(_)
            | Anchor::Name { .. }
            | Anchor::RoleName { .. }
            | Anchor::TagClasses { .. } => Strategy::Attribute,
            Anchor::Text { .. } => Strategy::Text,
            Anchor::Position(_) => Strategy::Structural,
        }
    }

    pub fn is_test_id(&self) -> bool {
        matches!(self, Anchor::TestId { .. })
    }

    pub fn render(&self, kind: LocatorKind) -> String {
        match kind {
            LocatorKind::Css => self.render_css(),
            LocatorKind::Xpath => self.render_xpath(),
        }
    }

    fn render_css(&self) -> String {
        match self {
            Anchor::TestId { attr, value } => format!("[{}={}]", attr, css_string(value)),
            Anchor::Id(id) if is_css_identifier(id) => format!("#{}", id),
            Anchor::Id(id) => format!("[id={}]", css_string(id)),
            Anchor::Name { tag, value } => format!("{}[name={}]", tag, css_string(value)),
            Anchor::RoleName {
                role,
                name,
                via_aria: true,
            } => format!("[role={}][aria-label={}]", css_string(role), css_string(name)),
            Anchor::RoleName { role, name, .. } => {
                format!("[role={}]:has-text({})", css_string(role), css_text(name))
            }
            Anchor::TagClasses { tag, classes } => format!("{}.{}", tag, classes.join(".")),
            Anchor::Text { tag, text } => format!("{}:has-text({})", tag, css_text(text)),
            Anchor::Position(path) => {
                let steps: Vec<String> = path
                    .iter()
                    .map(|seg| match seg.tag.as_str() {
                        "html" | "body" => seg.tag.clone(),
                        _ => format!("{}:nth-of-type({})", seg.tag, seg.index),
                    })
                    .collect();
                steps.join(" > ")
            }
        }
    }

    fn render_xpath(&self) -> String {
        match self {
            Anchor::TestId { attr, value } => format!("//*[@{}={}]", attr, xpath_literal(value)),
            Anchor::Id(id) => format!("//*[@id={}]", xpath_literal(id)),
            Anchor::Name { tag, value } => format!("//{}[@name={}]", tag, xpath_literal(value)),
            Anchor::RoleName {
                role,
                name,
                via_aria: true,
            } => format!(
                "//*[@role={} and @aria-label={}]",
                xpath_literal(role),
                xpath_literal(name)
            ),
            Anchor::RoleName { role, name, .. } => format!(
                "//*[@role={} and normalize-space()={}]",
                xpath_literal(role),
                xpath_literal(name)
            ),
            Anchor::TagClasses { tag, classes } => {
                let tests: Vec<String> = classes
                    .iter()
                    .map(|c| format!("contains(@class,{})", xpath_literal(c)))
                    .collect();
                format!("//{}[{}]", tag, tests.join(" and "))
            }
            Anchor::Text { tag, text } => {
                format!("//{}[normalize-space()={}]", tag, xpath_literal(text))
            }
            Anchor::Position(path) => {
                let steps: Vec<String> = path
                    .iter()
                    .map(|seg| match seg.tag.as_str() {
                        "html" | "body" => seg.tag.clone(),
                        _ => format!("{}[{}]", seg.tag, seg.index),
                    })
                    .collect();
                let absolute = path.first().is_some_and(|seg| seg.tag == "html");
                let prefix = if absolute { "/" } else { "//" };
                format!("{}{}", prefix, steps.join("/"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn absolute_path() -> Vec<PathSegment> {
        vec![
            PathSegment::new("html", 1),
            PathSegment::new("body", 1),
            PathSegment::new("div", 2),
            PathSegment::new("button", 1),
        ]
    }

    #[test]
    fn test_positional_rendering() {
        let anchor = Anchor::Position(absolute_path());
        assert_eq!(
            anchor.render(LocatorKind::Css),
            "html > body > div:nth-of-type(2) > button:nth-of-type(1)"
        );
        assert_eq!(anchor.render(LocatorKind::Xpath), "/html/body/div[2]/button[1]");

        let relative = Anchor::Position(vec![PathSegment::new("input", 3)]);
        assert_eq!(relative.render(LocatorKind::Css), "input:nth-of-type(3)");
        assert_eq!(relative.render(LocatorKind::Xpath), "//input[3]");
    }

    #[test]
    fn test_attribute_rendering() {
        let id = Anchor::Id("user name".into());
        assert_eq!(id.render(LocatorKind::Css), "[id='user name']");
        assert_eq!(id.render(LocatorKind::Xpath), "//*[@id='user name']");

        let role = Anchor::RoleName {
            role: "button".into(),
            name: "Save".into(),
            via_aria: true,
        };
        assert_eq!(role.render(LocatorKind::Css), "[role='button'][aria-label='Save']");
        assert_eq!(
            role.render(LocatorKind::Xpath),
            "//*[@role='button' and @aria-label='Save']"
        );

        let classes = Anchor::TagClasses {
            tag: "button".into(),
            classes: vec!["btn".into(), "primary".into()],
        };
        assert_eq!(classes.render(LocatorKind::Css), "button.btn.primary");
        assert_eq!(
            classes.render(LocatorKind::Xpath),
            "//button[contains(@class,'btn') and contains(@class,'primary')]"
        );
    }

    #[test]
    fn test_strategy_follows_anchor() {
        assert_eq!(Anchor::Id("x".into()).strategy(), Strategy::Attribute);
        assert_eq!(
            Anchor::Text {
                tag: "a".into(),
                text: "Home".into()
            }
            .strategy(),
            Strategy::Text
        );
        assert_eq!(Anchor::Position(vec![]).strategy(), Strategy::Structural);
        assert!(Strategy::Attribute < Strategy::Text);
    }
}
