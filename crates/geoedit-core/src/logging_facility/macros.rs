//! Operation boundary macros
//!
//! Each macro emits one event carrying `component` (the calling module),
//! `op` and `event`, followed by any extra fields in `tracing` syntax. The
//! macros reach `tracing` and the schema constants through this crate, so
//! callers need neither as a direct dependency.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_op_event {
    ($level:ident, $event:expr, $op:expr $(, $($field:tt)*)?) => {
        $crate::__tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $event
            $(, $($field)*)?
        )
    };
}

/// Log the start of an operation at `info`
///
/// # Example
///
/// ```
/// # use geoedit_core::log_op_start;
/// log_op_start!("plan_deletion");
/// log_op_start!("plan_deletion", selection_len = 3);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(
            info,
            $crate::__types::schema::EVENT_START,
            $op
            $(, $($field)*)?
        )
    };
}

/// Log the successful end of an operation at `info`
///
/// `duration_ms` is mandatory and always comes first.
///
/// # Example
///
/// ```
/// # use geoedit_core::log_op_end;
/// log_op_end!("plan_deletion", duration_ms = 4);
/// log_op_end!("plan_deletion", duration_ms = 4, affected_len = 2);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(
            info,
            $crate::__types::schema::EVENT_END,
            $op,
            duration_ms = $duration
            $(, $($field)*)?
        )
    };
}

/// Log the failed end of an operation at `error`
///
/// The error goes through [`ExError`](crate::errors::ExError) so the event
/// carries its kind and stable code.
///
/// # Example
///
/// ```
/// # use geoedit_core::{log_op_error, errors::EditError};
/// let err = EditError::Internal { message: "lost".to_string() };
/// log_op_error!("history_undo", err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = ::core::convert::Into::into($err);
        $crate::__log_op_event!(
            error,
            $crate::__types::schema::EVENT_END_ERROR,
            $op,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code()
            $(, $($field)*)?
        )
    }};
}
