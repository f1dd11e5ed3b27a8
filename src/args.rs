//! Argument construction for tool invocations.
//!
//! Two shapes, matching how callers actually compose flags:
//!
//! - [`from_options`] — one-shot: a list of `(key, value)` pairs becomes a
//!   list of `-key value` tokens, in the order given. Used by operations that
//!   take an options mapping (composite, clut, canvas fill).
//! - [`CommandArgs`] — accumulator: append flags one at a time, then drain
//!   into a single invocation. Used by
//!   [`combine_options`](crate::image::Image::combine_options) to batch
//!   several in-place edits into one process spawn.

/// Convert `(key, value)` pairs into the tool's flag syntax.
///
/// Each pair emits the single token `-key value` (flag and value joined by
/// one space, not two separate tokens — the tool splits attached values
/// itself). Order follows the slice; callers that care about flag order pass
/// pairs in insertion order rather than an unordered map.
pub fn from_options(options: &[(&str, &str)]) -> Vec<String> {
    options
        .iter()
        .map(|(key, value)| format!("-{key} {value}"))
        .collect()
}

/// Accumulator for composing several flags before one invocation.
#[derive(Debug, Default)]
pub struct CommandArgs {
    args: Vec<String>,
}

impl CommandArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `-name` followed by zero or more values as separate tokens.
    pub fn append<I, S>(&mut self, name: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.push(format!("-{name}"));
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    /// Append the plus form `+name`, for tools that distinguish `-opt`
    /// (enable) from `+opt` (disable/reset).
    pub fn append_plus(&mut self, name: &str) -> &mut Self {
        self.args.push(format!("+{name}"));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Consume the accumulator, yielding the composed argument vector.
    pub fn into_args(self) -> Vec<String> {
        self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_options_joins_key_and_value_in_one_token() {
        let args = from_options(&[("format", "png")]);
        assert_eq!(args, vec!["-format png"]);
    }

    #[test]
    fn from_options_preserves_insertion_order() {
        let args = from_options(&[("resize", "100x100"), ("quality", "80"), ("strip", "")]);
        assert_eq!(args, vec!["-resize 100x100", "-quality 80", "-strip "]);
    }

    #[test]
    fn from_options_empty_mapping() {
        assert!(from_options(&[]).is_empty());
    }

    #[test]
    fn append_emits_flag_then_values() {
        let mut args = CommandArgs::new();
        args.append("resize", ["50%"]);
        assert_eq!(args.into_args(), vec!["-resize", "50%"]);
    }

    #[test]
    fn append_without_values() {
        let mut args = CommandArgs::new();
        args.append("strip", Vec::<String>::new());
        assert_eq!(args.into_args(), vec!["-strip"]);
    }

    #[test]
    fn append_plus_emits_plus_form() {
        let mut args = CommandArgs::new();
        args.append_plus("antialias");
        assert_eq!(args.into_args(), vec!["+antialias"]);
    }

    #[test]
    fn is_empty_reflects_accumulated_flags() {
        let mut args = CommandArgs::new();
        assert!(args.is_empty());
        args.append_plus("repage");
        assert!(!args.is_empty());
    }

    #[test]
    fn accumulator_composes_in_call_order() {
        let mut args = CommandArgs::new();
        args.append("resize", ["50%"])
            .append_plus("repage")
            .append("crop", ["10x10+0+0"]);
        assert_eq!(
            args.into_args(),
            vec!["-resize", "50%", "+repage", "-crop", "10x10+0+0"]
        );
    }
}
