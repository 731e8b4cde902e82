//! The closed set of XML-like sentinels used to tag textual content shown
//! to the LLM or the user, so either side can parse them back out.

/// One member of the error-tag vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTag {
    /// Wraps text describing a user-initiated cancellation.
    UserCancellation,
    /// Wraps text describing a recoverable tool failure.
    ToolError,
    /// Wraps the reason a middleware stopped the loop.
    KinStopEvent,
    /// Wraps an advisory warning (e.g. context-window usage).
    KinWarning,
}

impl ErrorTag {
    /// The tag name, without angle brackets.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::UserCancellation => "user_cancellation",
            Self::ToolError => "tool_error",
            Self::KinStopEvent => "kin_stop_event",
            Self::KinWarning => "kin_warning",
        }
    }
}

/// Wrap `body` in `<tag>...</tag>`.
#[must_use]
pub fn tag(t: ErrorTag, body: impl AsRef<str>) -> String {
    format!("<{0}>{1}</{0}>", t.name(), body.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_body_in_named_tag() {
        assert_eq!(
            tag(ErrorTag::ToolError, "boom"),
            "<tool_error>boom</tool_error>"
        );
    }
}
