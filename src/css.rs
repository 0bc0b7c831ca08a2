/// Stylesheet injected into reddit pages for highlighted comments

use crate::options::Options;

/// Suffix of the helper class that carries the fade-out transition
pub const TRANSITION_SUFFIX: &str = "-transition";

pub fn transition_class(options: &Options) -> String {
    format!("{}{}", options.class_name, TRANSITION_SUFFIX)
}

/// Build the highlight stylesheet.
///
/// Reddit renders the comment body inside the `comment` slot of
/// `shreddit-comment`, so colors are applied to that slot rather than the
/// whole subtree (which would also tint replies).
pub fn stylesheet(options: &Options) -> String {
    let class = &options.class_name;
    let transition = transition_class(options);
    let body = format!(".{} > [slot=\"comment\"]", class);

    let mut css = String::new();

    css.push_str(&rule(
        &body,
        &[
            ("background-color", options.back_color.as_str()),
            ("color", options.front_color.as_str()),
            ("border", options.border.as_str()),
            ("border-radius", "4px"),
            ("padding", "2px 6px"),
        ],
    ));

    css.push_str("@media (prefers-color-scheme: dark) {\n");
    css.push_str(&rule(
        &body,
        &[
            ("background-color", options.back_color_dark.as_str()),
            ("color", options.front_color_dark.as_str()),
        ],
    ));
    css.push_str("}\n");

    let duration = format!(
        "background-color {ms}ms ease-out, color {ms}ms ease-out",
        ms = options.clear_comment_transition_ms
    );
    css.push_str(&rule(
        &format!(".{} > [slot=\"comment\"]", transition),
        &[("transition", duration.as_str())],
    ));

    if !options.custom_css.trim().is_empty() {
        css.push_str(options.custom_css.trim());
        css.push('\n');
    }

    css
}

fn rule(selector: &str, declarations: &[(&str, &str)]) -> String {
    let body: String = declarations
        .iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(property, value)| format!("  {}: {};\n", property, value.trim()))
        .collect();

    format!("{} {{\n{}}}\n", selector, body)
}
