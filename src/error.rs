use core::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Grid has a zero-sized axis
    ZeroExtent { extent: [u32; 3] },
    /// filter_min > filter_max along an axis
    WindowInverted { axis: char, lo: i32, hi: i32 },
    /// Filter window is wider than the grid along an axis
    WindowExceedsExtent { axis: char, lo: i32, hi: i32, extent: u32 },
    /// Unrecognized enum name in a config
    UnknownVariant { kind: &'static str, name: String },
    /// An operation was requested in a phase that does not allow it
    OutOfOrder { op: &'static str, phase: &'static str },
    /// The dispatch collaborator failed; grid state after a partial pass is undefined
    Dispatch {
        kernel: &'static str,
        iteration: u32,
        reason: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroExtent { extent } => {
                write!(
                    f,
                    "grid extent {}x{}x{} has a zero axis",
                    extent[0], extent[1], extent[2]
                )
            }
            Self::WindowInverted { axis, lo, hi } => {
                write!(f, "filter window inverted on {axis}: {lo}..={hi}")
            }
            Self::WindowExceedsExtent {
                axis,
                lo,
                hi,
                extent,
            } => {
                write!(
                    f,
                    "filter window {lo}..={hi} on {axis} exceeds grid extent {extent}"
                )
            }
            Self::UnknownVariant { kind, name } => {
                write!(f, "unrecognized {kind} '{name}'")
            }
            Self::OutOfOrder { op, phase } => {
                write!(f, "'{op}' is not allowed in phase {phase}")
            }
            Self::Dispatch {
                kernel,
                iteration,
                reason,
            } => {
                write!(
                    f,
                    "dispatch of '{kernel}' failed at iteration {iteration}: {reason}"
                )
            }
        }
    }
}

impl std::error::Error for Error {}
