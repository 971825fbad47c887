use failure::Fail;

pub use failure::err_msg;
pub use failure::format_err;
pub use failure::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Misuse of a graph builder. These indicate a programming error in the caller
/// rather than bad input data.
#[derive(Debug, Fail, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[fail(display = "State {} does not belong to this graph", index)]
    ForeignState { index: usize },

    #[fail(display = "Transition {} does not belong to this graph", index)]
    ForeignTransition { index: usize },

    #[fail(display = "State {} has already been deleted", index)]
    DeletedState { index: usize },

    #[fail(display = "Transition {} has already been deleted", index)]
    DeletedTransition { index: usize },
}
