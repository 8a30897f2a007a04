//! Embedded listing templates.
//!
//! Templates use `{$ ... $}` blocks, `{{ ... }}` variables and `$$` line
//! statements.

use std::borrow::Cow;

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, Error, UndefinedBehavior};
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "src/codegen/templates"]
struct TemplateAssets;

pub(crate) fn environment() -> Result<Environment<'static>, Error> {
    let mut env = Environment::new();
    let syntax = SyntaxConfig::builder()
        .block_delimiters("{$", "$}")
        .variable_delimiters("{{", "}}")
        .line_statement_prefix("$$")
        .build()?;
    env.set_syntax(syntax);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_loader(template_loader);
    Ok(env)
}

/// `{$ include "rust" $}` resolves to `rust.jinja`.
fn template_loader(name: &str) -> Result<Option<String>, Error> {
    let filename = if name.ends_with(".jinja") {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.jinja"))
    };
    Ok(TemplateAssets::get(filename.as_ref())
        .and_then(|file| std::str::from_utf8(file.data.as_ref()).ok().map(str::to_string)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_are_embedded() {
        let env = environment().unwrap();
        assert!(env.get_template("rust").is_ok());
        assert!(env.get_template("cpp").is_ok());
        assert!(env.get_template("missing").is_err());
    }
}
