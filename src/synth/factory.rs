use super::voice::VoiceEngine;

/// Builds the identical engines that fill a voice pool.
///
/// Configure the sound once and the pool calls the factory for every slot.
/// Any `Fn() -> V` closure is a factory.
pub trait VoiceFactory: Send {
    type Voice: VoiceEngine;

    fn create_voice(&self) -> Self::Voice;
}

impl<F, V> VoiceFactory for F
where
    F: Fn() -> V + Send,
    V: VoiceEngine,
{
    type Voice = V;

    fn create_voice(&self) -> Self::Voice {
        self()
    }
}
