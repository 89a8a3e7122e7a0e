//! # Pathos Limbic
//!
//! Translates affective state into behaviour:
//!
//! - **Policy blender**: mood + neurochemistry + persona + memory + safety
//!   → `GenerationDirective` (style knobs, strategy, capped context)
//! - **Self-reflection**: the same turn's state → `ReflectionRecord`
//!
//! Both are pure functions of their inputs.

pub mod policy;
pub mod reflection;

pub use policy::{
    GenerationDirective, MemoryExcerpt, PolicyBlender, SafetyFlags, SamplingHints, Strategy,
    StyleParams, TurnCues,
};
pub use reflection::{reflect, ReflectionContext, ReflectionRecord};
