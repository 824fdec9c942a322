//! Cascade: resolve the declarations that apply to one element.

use std::collections::BTreeMap;

use super::element_ref::ElementRef;
use super::selector::Specificity;
use super::stylesheet::{Declaration, Stylesheet, parse_declarations};

/// Resolved style properties, keyed by lowercase property name.
pub type StyleMap = BTreeMap<String, String>;

const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

/// A rule that matched, with ordering information for the cascade.
#[derive(Debug)]
struct MatchedRule<'a> {
    declarations: &'a [Declaration],
    specificity: Specificity,
    order: usize,
}

/// Compute the style of an element from a stylesheet and its inline `style`.
///
/// Returns `None` when nothing remains after dropping default colors.
pub fn compute_style(
    element: ElementRef<'_>,
    stylesheet: &Stylesheet,
    inline: Option<&str>,
) -> Option<StyleMap> {
    let mut matched: Vec<MatchedRule> = stylesheet
        .rules
        .iter()
        .enumerate()
        .filter_map(|(order, rule)| {
            rule.selectors
                .iter()
                .filter(|s| s.selector.matches(element))
                .map(|s| s.specificity)
                .max()
                .map(|specificity| MatchedRule {
                    declarations: &rule.declarations,
                    specificity,
                    order,
                })
        })
        .collect();

    // Specificity first, then source order
    matched.sort_by(|a, b| {
        a.specificity
            .cmp(&b.specificity)
            .then(a.order.cmp(&b.order))
    });

    let mut style = StyleMap::new();
    for rule in &matched {
        for decl in rule.declarations {
            apply_declaration(&mut style, decl);
        }
    }

    if let Some(inline) = inline {
        for decl in &parse_declarations(inline) {
            apply_declaration(&mut style, decl);
        }
    }

    remove_default_colors(&mut style);

    if style.is_empty() { None } else { Some(style) }
}

/// Apply a declaration, letting `margin`/`padding` shorthands reset their longhands.
fn apply_declaration(style: &mut StyleMap, decl: &Declaration) {
    if matches!(decl.property.as_str(), "margin" | "padding") {
        for side in SIDES {
            style.remove(&format!("{}-{side}", decl.property));
        }
    }
    style.insert(decl.property.clone(), decl.value.clone());
}

fn remove_default_colors(style: &mut StyleMap) {
    for property in ["background", "background-color"] {
        if style.get(property).is_some_and(|v| is_white(v)) {
            style.remove(property);
        }
    }
    if style.get("color").is_some_and(|v| is_black(v)) {
        style.remove("color");
    }
}

fn normalize_color(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn is_white(value: &str) -> bool {
    matches!(
        normalize_color(value).as_str(),
        "white" | "#fff" | "#ffffff" | "rgb(255,255,255)"
    )
}

fn is_black(value: &str) -> bool {
    matches!(
        normalize_color(value).as_str(),
        "black" | "#000" | "#000000" | "rgb(0,0,0)"
    )
}
