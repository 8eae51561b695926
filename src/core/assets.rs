//! Embedded templates.
//!
//! Templates are baked into the binary so `init` and `skill new` work without
//! any files shipped alongside it.

/// Embed template files at compile time as text.
///
/// Generates:
/// - Public constants for each embedded template
/// - `get_template(path)` function for lookup
/// - `list_templates()` function for discovery
macro_rules! embedded_templates {
    ($($path:expr => $const_name:ident),* $(,)?) => {
        $(
            pub const $const_name: &str =
                include_str!(concat!("../../templates/", $path));
        )*

        pub fn get_template(path: &str) -> Option<&'static str> {
            match path {
                $( $path => Some($const_name), )*
                _ => None,
            }
        }

        pub fn list_templates() -> Vec<&'static str> {
            vec![ $( $path, )* ]
        }
    };
}

embedded_templates! {
    "skillpack.toml" => TEMPLATE_CONFIG,
    "SKILL.md" => TEMPLATE_SKILL,
    "changeset_README.md" => TEMPLATE_CHANGESET_README,
}

/// Substitute `{{key}}` placeholders.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{{{}}}}}", key), value);
    }
    out
}
