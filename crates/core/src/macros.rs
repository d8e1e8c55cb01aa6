// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Boilerplate macros shared by the core types.
//!
//! - [`simple_display!`]: `Display` for fieldless enums
//! - [`setters!`]: chained setters on request types such as `Submission`
//! - [`builder!`]: test builders that start from a seed value

/// `Display` for a fieldless enum, one string per variant.
///
/// ```ignore
/// crate::simple_display! {
///     ErrorStage {
///         Build => "build",
///         Runtime => "runtime",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident => $text:literal ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let text = match self {
                    $( Self::$variant => $text, )+
                };
                f.write_str(text)
            }
        }
    };
}

/// Consuming setters, expanded inside an `impl` block.
///
/// `into` fields accept `impl Into<T>`, `set` fields take `T` as is, and
/// `option` fields store `Some(v.into())`.
///
/// ```ignore
/// impl Submission {
///     crate::setters! {
///         into { query: String }
///         set { priority: u32 }
///         option { system_prompt: String }
///     }
/// }
/// ```
#[macro_export]
macro_rules! setters {
    (
        $(into { $( $into_field:ident : $into_ty:ty ),* $(,)? })?
        $(set { $( $set_field:ident : $set_ty:ty ),* $(,)? })?
        $(option { $( $opt_field:ident : $opt_ty:ty ),* $(,)? })?
    ) => {
        $($(
            pub fn $into_field(self, v: impl Into<$into_ty>) -> Self {
                Self { $into_field: v.into(), ..self }
            }
        )*)?
        $($(
            pub fn $set_field(self, v: $set_ty) -> Self {
                Self { $set_field: v, ..self }
            }
        )*)?
        $($(
            pub fn $opt_field(self, v: impl Into<$opt_ty>) -> Self {
                Self { $opt_field: Some(v.into()), ..self }
            }
        )*)?
    };
}

/// Test builder wrapping a seed value of the target type.
///
/// `Target::builder()` starts from `seed`; the setter groups follow
/// [`setters!`] and `build()` hands back the value. Everything is compiled
/// only for tests and the `test-support` feature.
///
/// ```ignore
/// crate::builder! {
///     QueueEntryBuilder => QueueEntry,
///     seed: QueueEntry::new(ExecutionId::from_string("exe-test"), 1, 0),
///     set { priority: u32 }
///     option { last_error: String }
/// }
/// ```
#[macro_export]
macro_rules! builder {
    (
        $builder:ident => $target:ident,
        seed: $seed:expr,
        $(into { $( $into_field:ident : $into_ty:ty ),* $(,)? })?
        $(set { $( $set_field:ident : $set_ty:ty ),* $(,)? })?
        $(option { $( $opt_field:ident : $opt_ty:ty ),* $(,)? })?
    ) => {
        #[cfg(any(test, feature = "test-support"))]
        pub struct $builder($target);

        #[cfg(any(test, feature = "test-support"))]
        impl $builder {
            $($(
                pub fn $into_field(mut self, v: impl Into<$into_ty>) -> Self {
                    self.0.$into_field = v.into();
                    self
                }
            )*)?
            $($(
                pub fn $set_field(mut self, v: $set_ty) -> Self {
                    self.0.$set_field = v;
                    self
                }
            )*)?
            $($(
                pub fn $opt_field(mut self, v: impl Into<$opt_ty>) -> Self {
                    self.0.$opt_field = Some(v.into());
                    self
                }
            )*)?

            pub fn build(self) -> $target {
                self.0
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $target {
            pub fn builder() -> $builder {
                $builder($seed)
            }
        }
    };
}
