//! Fixed emergency reference attached to every safety analysis

use serde::{Deserialize, Serialize};

const MAN_OVERBOARD: &[&str] = &[
    "Shout \"Man overboard!\" and point continuously at the person in the water",
    "Throw a lifebuoy or throwable flotation immediately",
    "Press the MOB button on the GPS/chartplotter",
    "Perform a recovery manoeuvre (quick-stop or figure-eight)",
    "Issue a DSC distress alert / Mayday on VHF channel 16 if recovery is not immediate",
];

const ENGINE_FAILURE: &[&str] = &[
    "Hoist sail or anchor if drifting toward danger",
    "Check fuel supply, filters and raw-water cooling intake",
    "Inspect the propeller for fouled lines",
    "Request a tow or issue a Pan-Pan on VHF channel 16 if unable to make safe harbour",
];

const MEDICAL_EMERGENCY: &[&str] = &[
    "Assess the casualty and administer first aid",
    "Contact the coast guard on VHF channel 16 for radio medical advice",
    "Issue a Mayday for life-threatening conditions",
    "Divert to the nearest port with medical facilities",
];

const COLLISION: &[&str] = &[
    "Account for all crew and put on lifejackets",
    "Check for hull damage and water ingress; start bilge pumps",
    "Plug or fother any breach",
    "Issue a Mayday if the vessel is taking on water faster than pumps can clear",
    "Exchange vessel details and log the incident",
];

/// Checklists for the four standard emergencies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyProcedures {
    pub man_overboard: Vec<String>,
    pub engine_failure: Vec<String>,
    pub medical_emergency: Vec<String>,
    pub collision: Vec<String>,
}

impl EmergencyProcedures {
    #[must_use]
    pub fn standard() -> Self {
        Self {
            man_overboard: to_owned(MAN_OVERBOARD),
            engine_failure: to_owned(ENGINE_FAILURE),
            medical_emergency: to_owned(MEDICAL_EMERGENCY),
            collision: to_owned(COLLISION),
        }
    }
}

fn to_owned(steps: &[&str]) -> Vec<String> {
    steps.iter().map(|s| (*s).to_string()).collect()
}
