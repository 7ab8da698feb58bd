use structlink::engine::config::{
    ContactSettings, DEFAULT_DISTANCE_CUTOFF, DEFAULT_REPLY_TIMEOUT, HBondSettings,
    InteractionScope,
};

pub struct DefaultsConfig {
    pub reply_timeout_secs: u64,
    pub scope: InteractionScope,
    pub ignore_water: bool,
    pub contacts_enabled: bool,
    pub contacts: ContactSettings,
    pub clashes: ContactSettings,
    pub hbonds: HBondSettings,
    pub distance_cutoff: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            reply_timeout_secs: DEFAULT_REPLY_TIMEOUT.as_secs(),
            scope: InteractionScope::WithinSelection,
            ignore_water: true,
            contacts_enabled: true,
            contacts: ContactSettings::CONTACTS,
            clashes: ContactSettings::CLASHES,
            hbonds: HBondSettings::default(),
            distance_cutoff: DEFAULT_DISTANCE_CUTOFF,
        }
    }
}
