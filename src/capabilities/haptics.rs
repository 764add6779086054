use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HapticStyle {
    #[default]
    Light,
    Medium,
    Selection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HapticsOperation {
    Pulse { style: HapticStyle },
}

impl Operation for HapticsOperation {
    type Output = ();
}

/// Fire-and-forget haptic feedback. Shells without a vibration motor
/// acknowledge and do nothing; a pulse can never fail the caller's flow.
pub struct Haptics<Ev> {
    context: CapabilityContext<HapticsOperation, Ev>,
}

impl<Ev> Clone for Haptics<Ev> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

impl<Ev> Capability<Ev> for Haptics<Ev> {
    type Operation = HapticsOperation;
    type MappedSelf<MappedEv> = Haptics<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Haptics::new(self.context.map_event(f))
    }
}

impl<Ev> Haptics<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<HapticsOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn pulse(&self, style: HapticStyle) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context
                .notify_shell(HapticsOperation::Pulse { style })
                .await;
        });
    }
}
