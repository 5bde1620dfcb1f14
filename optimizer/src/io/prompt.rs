//! Prompt rendering for generation requests.
//!
//! Templates are compiled into the binary. The system prompt carries the fixed
//! rules; the user message carries one [`PromptContext`] snapshot.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::history::PromptContext;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");
const ITERATION_TEMPLATE: &str = include_str!("prompts/iteration.md");

/// A rendered two-part prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Template engine wrapper around minijinja.
pub struct PromptBuilder {
    env: Environment<'static>,
    language: String,
}

impl PromptBuilder {
    pub fn new(language: impl Into<String>) -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("system", SYSTEM_TEMPLATE)
            .context("load system template")?;
        env.add_template("iteration", ITERATION_TEMPLATE)
            .context("load iteration template")?;
        Ok(Self {
            env,
            language: language.into(),
        })
    }

    pub fn render(&self, ctx: &PromptContext) -> Result<Prompt> {
        let system = self
            .env
            .get_template("system")?
            .render(context! { language => self.language.as_str() })
            .context("render system prompt")?;
        let user = self
            .env
            .get_template("iteration")?
            .render(context! { ctx => ctx })
            .context("render iteration prompt")?;
        Ok(Prompt { system, user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(previous_error: Option<&str>) -> PromptContext {
        PromptContext {
            base_code: "print('hello')".to_string(),
            base_time_micros: 42_000,
            two_iterations_ago_code: String::new(),
            two_iterations_ago_time_micros: 0,
            previous_code: "print('hello' )".to_string(),
            previous_time_micros: 41_000,
            previous_failed: previous_error.is_some(),
            previous_error: previous_error.map(str::to_string),
            reference_output: "hello\n".to_string(),
            previous_output: "hello\n".to_string(),
        }
    }

    #[test]
    fn system_prompt_names_language() {
        let prompt = PromptBuilder::new("Python 3")
            .expect("builder")
            .render(&context(None))
            .expect("render");
        assert!(prompt.system.contains("senior Python 3 developer"));
        assert!(prompt.system.contains("byte-for-byte identical"));
    }

    #[test]
    fn fields_render_in_fixed_order() {
        let prompt = PromptBuilder::new("Python 3")
            .expect("builder")
            .render(&context(None))
            .expect("render");
        let user = &prompt.user;

        let keys = [
            "base_code:",
            "base_extime: 42000",
            "two_iterations_ago_code: ``````",
            "two_iterations_ago_extime: 0",
            "prev_iteration_code: ```print('hello' )```",
            "prev_iteration_extime: 41000",
            "prev_iteration_execution_error: False",
            "prev_iteration_error_description: None",
            "reference_results:",
            "prev_iteration_results:",
        ];
        let mut last = 0;
        for key in keys {
            let pos = user.find(key).unwrap_or_else(|| panic!("missing {key}"));
            assert!(pos >= last, "{key} out of order");
            last = pos;
        }
    }

    #[test]
    fn failure_renders_error_description() {
        let prompt = PromptBuilder::new("Python 3")
            .expect("builder")
            .render(&context(Some("SyntaxError: invalid syntax")))
            .expect("render");
        assert!(prompt.user.contains("prev_iteration_execution_error: True"));
        assert!(
            prompt
                .user
                .contains("prev_iteration_error_description: ```SyntaxError: invalid syntax```")
        );
    }

    #[test]
    fn code_is_not_html_escaped() {
        let mut ctx = context(None);
        ctx.base_code = "if a < b and c > d: print(\"&\")".to_string();
        let prompt = PromptBuilder::new("Python 3")
            .expect("builder")
            .render(&ctx)
            .expect("render");
        assert!(prompt.user.contains("if a < b and c > d: print(\"&\")"));
    }
}
