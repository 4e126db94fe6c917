use std::sync::{Arc, Mutex};

use crate::{
    Phonemizer, PhonemizerFactory, PhonemizerTable, Registries, RendererTable, SingerCatalogue,
    SingerRef, Subbank, TypeKey, VoiceBank, VoiceType,
};

#[derive(Debug)]
pub struct KanaPhonemizer {
    key: TypeKey,
    singer: Option<SingerRef>,
}

impl KanaPhonemizer {
    pub const KEY: &'static str = "Test.KanaPhonemizer";
}

impl Phonemizer for KanaPhonemizer {
    fn type_key(&self) -> &TypeKey {
        &self.key
    }
    fn tag(&self) -> &str {
        "KANA"
    }
    fn set_singer(&mut self, singer: Option<&SingerRef>) {
        self.singer = singer.cloned();
    }
    fn singer(&self) -> Option<&SingerRef> {
        self.singer.as_ref()
    }
}

pub const BROKEN_PHONEMIZER: &str = "Test.BrokenPhonemizer";

/// Registries with two singers:
/// - `alice`, concatenative, sub-voicebank colors come from `alice_colors` (initially red, blue, red)
/// - `bob`, neural, one uncolored sub-voicebank and a "soft" one
pub struct Fixture {
    pub singers: SingerCatalogue,
    pub phonemizers: PhonemizerTable,
    pub renderers: RendererTable,
    pub alice: Arc<VoiceBank>,
    pub alice_colors: Arc<Mutex<Vec<Subbank>>>,
}

impl Fixture {
    pub fn new() -> Self {
        let alice_colors = Arc::new(Mutex::new(
            ["red", "blue", "red"]
                .into_iter()
                .map(Subbank::with_color)
                .collect::<Vec<_>>(),
        ));
        let source = alice_colors.clone();

        let alice = Arc::new(VoiceBank::new(
            "alice",
            "Alice",
            VoiceType::Concatenative,
            move || Ok(source.lock().unwrap().clone()),
        ));

        let mut singers = SingerCatalogue::new();
        singers.insert(alice.clone());
        singers.insert(Arc::new(VoiceBank::with_subbanks(
            "bob",
            "Bob",
            VoiceType::Neural,
            vec![Subbank::with_color(""), Subbank::with_color("soft")],
        )));

        let mut phonemizers = PhonemizerTable::new();
        phonemizers.register(PhonemizerFactory::new(
            TypeKey::from_static(KanaPhonemizer::KEY),
            "Kana",
            "KANA",
            || {
                Ok(Box::new(KanaPhonemizer {
                    key: TypeKey::from_static(KanaPhonemizer::KEY),
                    singer: None,
                }))
            },
        ));
        phonemizers.register(PhonemizerFactory::new(
            TypeKey::from_static(BROKEN_PHONEMIZER),
            "Broken",
            "BROKEN",
            || Err(anyhow::anyhow!("dictionary missing")),
        ));

        Self {
            singers,
            phonemizers,
            renderers: RendererTable::new(),
            alice,
            alice_colors,
        }
    }

    pub fn registries(&self) -> Registries<'_> {
        Registries::new(&self.singers, &self.phonemizers, &self.renderers)
    }

    pub fn singer(&self, id: &str) -> SingerRef {
        use crate::SingerLookup;
        self.singers.by_id(id).unwrap()
    }
}
