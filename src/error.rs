//! src/error.rs

/// Debug output for boundary errors: the error itself, then each cause on
/// its own numbered line. Workers print these when a task dies, so the whole
/// chain has to land in one log record.
pub fn write_error_chain(
    f: &mut std::fmt::Formatter<'_>,
    error: &(dyn std::error::Error + 'static),
) -> std::fmt::Result {
    write!(f, "{error}")?;
    let causes = std::iter::successors(error.source(), |cause| cause.source());
    for (depth, cause) in causes.enumerate() {
        write!(f, "\n  {}: {cause}", depth + 1)?;
    }
    Ok(())
}
