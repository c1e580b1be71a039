//! Event records and their argument values.

use std::fmt;

use compact_str::CompactString;

/// Name of an event or argument.
///
/// Names up to 24 bytes live inline, so the usual short, static event names
/// never touch the heap while recording.
pub type EventName = CompactString;

/// Longest name kept on a recorded event, in bytes.
pub const MAX_NAME_LEN: usize = 125;

/// Build an [`EventName`], truncating at a char boundary past [`MAX_NAME_LEN`].
pub fn event_name(name: &str) -> EventName {
    if name.len() <= MAX_NAME_LEN {
        return CompactString::new(name);
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    CompactString::new(&name[..end])
}

/// Kind of trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Begin,
    End,
    Complete,
    Instant,
    Metadata,
}

impl Phase {
    /// Single-character phase code of the trace-event format.
    pub fn code(self) -> char {
        match self {
            Phase::Begin => 'B',
            Phase::End => 'E',
            Phase::Complete => 'X',
            Phase::Instant => 'i',
            Phase::Metadata => 'M',
        }
    }
}

/// A single argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(CompactString),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::UInt(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Value of an event argument: one scalar or a homogeneous array of them.
///
/// Arrays mixing scalar kinds are accepted but their rendering is not part of
/// the output contract.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Scalar(Scalar),
    Array(Vec<Scalar>),
}

macro_rules! impl_scalar_from {
    ($($ty:ty => $variant:ident($conv:expr)),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::$variant($conv(value))
                }
            }

            impl From<$ty> for ArgValue {
                fn from(value: $ty) -> Self {
                    ArgValue::Scalar(value.into())
                }
            }

            impl From<Vec<$ty>> for ArgValue {
                fn from(values: Vec<$ty>) -> Self {
                    ArgValue::Array(values.into_iter().map(Scalar::from).collect())
                }
            }
        )*
    };
}

impl_scalar_from! {
    &str => Str(CompactString::new),
    String => Str(CompactString::from),
    CompactString => Str(std::convert::identity),
    i32 => Int(i64::from),
    i64 => Int(std::convert::identity),
    u32 => UInt(u64::from),
    u64 => UInt(std::convert::identity),
    usize => UInt(|v: usize| v as u64),
    f32 => Float(f64::from),
    f64 => Float(std::convert::identity),
    bool => Bool(std::convert::identity),
}

impl From<Scalar> for ArgValue {
    fn from(value: Scalar) -> Self {
        ArgValue::Scalar(value)
    }
}

/// A named argument attached to an event.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceArg {
    pub name: EventName,
    pub value: ArgValue,
}

impl TraceArg {
    pub fn new(name: &str, value: impl Into<ArgValue>) -> Self {
        Self {
            name: event_name(name),
            value: value.into(),
        }
    }
}

/// Build a `Vec<TraceArg>` from `name => value` pairs.
///
/// ```
/// use trace_recorder::trace_args;
///
/// let args = trace_args!["frame" => 12, "tags" => vec!["a", "b"]];
/// assert_eq!(args.len(), 2);
/// ```
#[macro_export]
macro_rules! trace_args {
    ($($name:expr => $value:expr),* $(,)?) => {
        vec![$($crate::TraceArg::new($name, $value)),*]
    };
}

/// One recorded event. Immutable once appended to a buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    pub name: EventName,
    pub phase: Phase,
    /// Microseconds since the owning buffer's start
    pub timestamp: i64,
    /// Microseconds; only meaningful for [`Phase::Complete`]
    pub duration: i64,
    pub thread_id: u64,
    pub args: Vec<TraceArg>,
}

impl TraceEvent {
    /// A metadata event as synthesized by the formatter.
    pub(crate) fn metadata(name: &str, thread_id: u64, args: Vec<TraceArg>) -> Self {
        Self {
            name: event_name(name),
            phase: Phase::Metadata,
            timestamp: 0,
            duration: 0,
            thread_id,
            args,
        }
    }
}
