//! # Form Record Model
//!
//! The flat record the form UI hands over for document generation. The
//! layout engine only ever reads it.
//!
//! Every field has an "empty" representation (blank string, empty set, `None`)
//! that the layout renders as a neutral placeholder. Single-select fields and
//! image payloads treat a blank string on the wire as `None`, since that is
//! what an untouched form input serializes to.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

/// Number of rows in the corrective-action table. Fixed by the paper form.
pub const ACTION_ROWS: usize = 4;

/// An encoded raster as produced by the upload / signature widgets.
///
/// Usually a `data:image/...;base64,` URI; raw base64 and file paths are
/// accepted too (see [`crate::image_loader::load_image`]).
pub type ImagePayload = String;

/// A closed set of options rendered as a row/grid of checkboxes.
///
/// `ALL` fixes the on-paper order of the options.
pub trait Choice: Copy + PartialEq + 'static {
    const ALL: &'static [Self];

    /// The printed label next to the checkbox.
    fn label(self) -> &'static str;
}

macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => ($wire:literal, $label:literal)),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl Choice for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }
    };
}

choice_enum! {
    /// Whether the activity may continue.
    ActivityStatus {
        Released => ("liberada", "Liberada"),
        ReleasedWithRestriction => ("liberadaRestricao", "Liberada c/ Restrição"),
        Suspended => ("suspensaParalisada", "Suspensa/Paralisada"),
    }
}

choice_enum! {
    /// Water supply vs. sewage system.
    NcType {
        Saa => ("saa", "SAA"),
        Ses => ("ses", "SES"),
    }
}

choice_enum! {
    Nature {
        Execution => ("execucao", "EXECUÇÃO"),
        Quality => ("qualidade", "QUALIDADE"),
        Safety => ("seguranca", "SEGURANÇA"),
        Design => ("projeto", "PROJETO"),
        Other => ("outros", "OUTROS"),
        Material => ("material", "MATERIAL"),
        Interference => ("interferencia", "INTERFERÊNCIA"),
        Environment => ("mAmbiente", "M. AMBIENTE"),
        Behaviour => ("organizComportamento", "ORGANIZ/COMPORTAMENTO"),
    }
}

choice_enum! {
    WorkCategory {
        Rce => ("rce", "RCE"),
        Rda => ("rda", "RDA"),
        Connections => ("ligacoes", "LIGAÇÕES"),
        Mains => ("adutora", "ADUTORA"),
        Other => ("outro", "OUTROS"),
        Collector => ("coletor", "COLETOR"),
        Lr => ("lr", "LR"),
        Eee => ("eee", "EEE"),
        Reservoir => ("reservatorio", "RESERVATÓRIO"),
        Ete => ("ete", "ETE"),
        Eta => ("eta", "ETA"),
        Dam => ("barragem", "BARRAGEM"),
        Paving => ("pavimentacao", "PAVIMENTAÇÃO"),
    }
}

choice_enum! {
    /// Severity grade. Single-select.
    Grade {
        Minor => ("leve", "LEVE"),
        Medium => ("media", "MÉDIA"),
        Serious => ("grave", "GRAVE"),
        Critical => ("gravissima", "GRAVÍSSIMA"),
    }
}

choice_enum! {
    /// General disposition for the corrective actions. Single-select.
    Disposition {
        Correct => ("corrigir", "CORRIGIR"),
        RejectSuspend => ("reprovarSuspender", "REPROVAR/SUSPENDER"),
        AuthorizeUnderConcession => ("autorizarConcessao", "AUTORIZAR SOB CONCESSÃO"),
        Inform => ("informar", "INFORMAR"),
    }
}

/// Page orientation selected by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// One row of the corrective-action table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionItem {
    pub action: String,
    pub responsible: String,
    pub due_date: String,
}

impl ActionItem {
    pub fn is_empty(&self) -> bool {
        self.action.is_empty() && self.responsible.is_empty() && self.due_date.is_empty()
    }
}

/// The complete form state at the moment "generate" is pressed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormRecord {
    // ── Identification ─────────────────────────────────────────
    #[serde(deserialize_with = "blank_as_none")]
    pub activity_status: Option<ActivityStatus>,
    /// Contracted company.
    pub company: String,
    pub contract: String,
    pub scope: String,
    /// Where the non-conformity was found. May be long (reverse geocoded).
    pub location: String,
    /// Person responsible for the work front.
    pub site_manager: String,

    // ── Classification ─────────────────────────────────────────
    pub nc_types: BTreeSet<NcType>,
    pub natures: BTreeSet<Nature>,
    pub work_categories: BTreeSet<WorkCategory>,
    #[serde(deserialize_with = "blank_as_none")]
    pub grade: Option<Grade>,

    // ── Observations ───────────────────────────────────────────
    pub problem: String,
    pub image1_caption: String,
    pub image2_caption: String,
    #[serde(deserialize_with = "blank_as_none")]
    pub image1: Option<ImagePayload>,
    #[serde(deserialize_with = "blank_as_none")]
    pub image2: Option<ImagePayload>,

    // ── Actions ────────────────────────────────────────────────
    #[serde(deserialize_with = "blank_as_none")]
    pub disposition: Option<Disposition>,
    #[serde(deserialize_with = "padded_actions")]
    pub actions: [ActionItem; ACTION_ROWS],

    // ── Signatures ─────────────────────────────────────────────
    pub opening_date: String,
    pub closing_date: String,
    #[serde(deserialize_with = "blank_as_none")]
    pub contractor_opening_signature: Option<ImagePayload>,
    #[serde(deserialize_with = "blank_as_none")]
    pub contracted_opening_signature: Option<ImagePayload>,
    #[serde(deserialize_with = "blank_as_none")]
    pub contractor_closing_signature: Option<ImagePayload>,
    #[serde(deserialize_with = "blank_as_none")]
    pub contracted_closing_signature: Option<ImagePayload>,
}

impl FormRecord {
    /// Parse a record from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, crate::error::RncError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Deserialize `""`, `null` or a missing field as `None`.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(v) => serde_json::from_value(v)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Accept up to [`ACTION_ROWS`] entries and pad the rest with empty rows.
fn padded_actions<'de, D>(deserializer: D) -> Result<[ActionItem; ACTION_ROWS], D::Error>
where
    D: Deserializer<'de>,
{
    let items = Vec::<ActionItem>::deserialize(deserializer)?;
    if items.len() > ACTION_ROWS {
        return Err(serde::de::Error::invalid_length(
            items.len(),
            &"at most 4 corrective actions",
        ));
    }
    let mut rows: [ActionItem; ACTION_ROWS] = Default::default();
    for (slot, item) in rows.iter_mut().zip(items) {
        *slot = item;
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_empty_record() {
        let record = FormRecord::from_json("{}").unwrap();
        assert_eq!(record, FormRecord::default());
        assert_eq!(record.actions.len(), ACTION_ROWS);
        assert!(record.actions.iter().all(ActionItem::is_empty));
    }

    #[test]
    fn blank_strings_are_none() {
        let record = FormRecord::from_json(
            r#"{ "activityStatus": "", "grade": "", "image1": "", "disposition": null }"#,
        )
        .unwrap();
        assert!(record.activity_status.is_none());
        assert!(record.grade.is_none());
        assert!(record.image1.is_none());
        assert!(record.disposition.is_none());
    }

    #[test]
    fn wire_values_map_to_options() {
        let record = FormRecord::from_json(
            r#"{
                "activityStatus": "liberadaRestricao",
                "ncTypes": ["ses"],
                "natures": ["mAmbiente", "execucao", "execucao"],
                "workCategories": ["pavimentacao"],
                "grade": "gravissima",
                "disposition": "autorizarConcessao"
            }"#,
        )
        .unwrap();
        assert_eq!(record.activity_status, Some(ActivityStatus::ReleasedWithRestriction));
        assert!(record.nc_types.contains(&NcType::Ses));
        assert_eq!(record.natures.len(), 2);
        assert!(record.work_categories.contains(&WorkCategory::Paving));
        assert_eq!(record.grade, Some(Grade::Critical));
        assert_eq!(record.disposition, Some(Disposition::AuthorizeUnderConcession));
    }

    #[test]
    fn unknown_option_is_rejected() {
        let err = FormRecord::from_json(r#"{ "grade": "catastrophic" }"#).unwrap_err();
        assert!(matches!(err, crate::error::RncError::Parse { .. }));
    }

    #[test]
    fn short_action_list_is_padded() {
        let record = FormRecord::from_json(
            r#"{ "actions": [{ "action": "Refazer vala", "responsible": "João", "dueDate": "2026-11-02" }] }"#,
        )
        .unwrap();
        assert_eq!(record.actions[0].action, "Refazer vala");
        assert!(record.actions[1].is_empty());
        assert!(record.actions[3].is_empty());
    }

    #[test]
    fn long_action_list_is_rejected() {
        let five = r#"{ "actions": [{}, {}, {}, {}, {}] }"#;
        assert!(FormRecord::from_json(five).is_err());
    }

    #[test]
    fn option_counts_match_paper_form() {
        assert_eq!(ActivityStatus::ALL.len(), 3);
        assert_eq!(NcType::ALL.len(), 2);
        assert_eq!(Nature::ALL.len(), 9);
        assert_eq!(WorkCategory::ALL.len(), 13);
        assert_eq!(Grade::ALL.len(), 4);
        assert_eq!(Disposition::ALL.len(), 4);
        assert_eq!(Nature::ALL[8].label(), "ORGANIZ/COMPORTAMENTO");
    }
}
