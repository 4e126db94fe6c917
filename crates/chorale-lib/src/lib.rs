//! Track binding for chorale: which singer, phonemizer and renderer a track uses, and how that
//! survives a save/load cycle.

mod type_key;
pub use type_key::{TypeKey, TypeKeyParseError, TypeKeyParseErrorKind};
pub mod singer;
pub use singer::{LoadHandle, MissingSinger, Singer, SingerRef, Subbank, VoiceBank, VoiceType};
mod catalogue;
pub use catalogue::{SingerCatalogue, SingerLookup};
mod phonemizer;
pub use phonemizer::{
    DefaultPhonemizer, Phonemizer, PhonemizerConstructor, PhonemizerFactory, PhonemizerRegistry,
    PhonemizerTable,
};
mod renderer;
pub use renderer::{NamedRenderer, Renderer, RendererConstructor, RendererFactory, RendererTable};
mod expression;
pub use expression::{
    ExpressionDescriptor, ExpressionKind, ExpressionTable, VOICE_COLOR_KEY, default_expressions,
};
mod registry;
pub use registry::Registries;
mod track;
pub use track::{RendererBinding, SingerRebind, Track, ValidateOptions};
mod project;
pub use project::Project;

#[cfg(test)]
mod test_util;
