use crate::{PhonemizerRegistry, RendererFactory, SingerLookup};

/// Everything resolution needs to look up. All of these are shared, read-only resources;
/// whoever owns them is responsible for not rescanning them mid-resolution.
#[derive(Clone, Copy)]
pub struct Registries<'a> {
    pub singers: &'a dyn SingerLookup,
    pub phonemizers: &'a dyn PhonemizerRegistry,
    pub renderers: &'a dyn RendererFactory,
}

impl<'a> Registries<'a> {
    pub fn new(
        singers: &'a dyn SingerLookup,
        phonemizers: &'a dyn PhonemizerRegistry,
        renderers: &'a dyn RendererFactory,
    ) -> Self {
        Self {
            singers,
            phonemizers,
            renderers,
        }
    }
}
