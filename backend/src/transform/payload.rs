//! Assemble submission payloads from validated records.
//!
//! Output follows the e-Manifest `save` schema:
//!
//! - bookkeeping (`manifestId`, handler row numbers) never reaches the payload
//! - optional sub-objects are omitted when the sheet had no data for them
//! - the potential ship date is pinned to 12:00 UTC so no timezone can move it
//!   to a neighbouring day

use chrono::{NaiveDate, SecondsFormat, TimeZone, Utc};
use std::collections::BTreeMap;

use super::grouper::HandlerGroup;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{
    AdditionalInfo, BrInfo, Code, DotInformation, HazardousWaste, Manifest, ManifestPayload,
    ManifestRecord, Phone, Quantity, WasteLine, WasteLineRecord,
};

/// Build one payload per manifest record, in manifest sheet order.
pub fn build_manifests(
    manifests: &[ManifestRecord],
    handlers: &[HandlerGroup],
    wastes: &BTreeMap<i64, Vec<WasteLineRecord>>,
) -> PipelineResult<Vec<ManifestPayload>> {
    manifests
        .iter()
        .map(|info| {
            let group = handlers
                .iter()
                .find(|g| g.manifest_id == info.manifest_id)
                .ok_or_else(|| PipelineError::Build {
                    manifest_id: info.manifest_id,
                    message: "no complete handler set".to_string(),
                })?;
            let lines = wastes
                .get(&info.manifest_id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            build_manifest(info, group, lines)
        })
        .collect()
}

/// Build the payload of a single manifest.
pub fn build_manifest(
    info: &ManifestRecord,
    group: &HandlerGroup,
    wastes: &[WasteLineRecord],
) -> PipelineResult<ManifestPayload> {
    if wastes.is_empty() {
        return Err(PipelineError::Build {
            manifest_id: info.manifest_id,
            message: "no waste lines".to_string(),
        });
    }

    let potential_ship_date = match info.potential_ship_date.as_deref() {
        None | Some("") => None,
        Some(date) => Some(ship_date_instant(date).ok_or_else(|| PipelineError::Build {
            manifest_id: info.manifest_id,
            message: format!("invalid potentialShipDate '{date}'"),
        })?),
    };

    let mut generator = group.generator.to_handler()?;
    generator.emergency_phone = Some(Phone {
        number: info.emergency_response_phone.clone(),
    });

    let transporters = group
        .transporters
        .iter()
        .map(|t| t.to_handler())
        .collect::<PipelineResult<Vec<_>>>()?;

    let broker = group.broker.as_ref().map(|b| b.to_handler()).transpose()?;

    Ok(ManifestPayload {
        manifest_id: info.manifest_id,
        payload: Manifest {
            submission_type: info.submission_type.clone(),
            status: info.status.clone(),
            potential_ship_date,
            generator,
            transporters,
            designated_facility: group.designated_facility.to_handler()?,
            broker,
            wastes: wastes.iter().map(build_waste_line).collect(),
            additional_info: AdditionalInfo::new(
                &info.comments,
                info.handling_instructions.as_deref(),
            ),
            import: false,
            contains_previous_reject_or_residue: false,
        },
    })
}

/// Expand one waste record into its payload line.
pub fn build_waste_line(line: &WasteLineRecord) -> WasteLine {
    let (dot_information, waste_description) = if line.dot_hazardous {
        let info = DotInformation {
            printed_dot_information: line.description.clone(),
            id_number: Code::new(line.id_number.clone().unwrap_or_default()),
        };
        (Some(info), None)
    } else {
        (None, Some(line.description.clone()))
    };

    let br_info = line.density_info().map(|(density, unit)| BrInfo {
        density: density.clone(),
        density_unit_of_measurement: Code::new(unit),
    });

    WasteLine {
        line_number: line.line_number,
        dot_hazardous: line.dot_hazardous,
        epa_waste: line.epa_waste,
        pcb: false,
        br: br_info.is_some(),
        dot_information,
        waste_description,
        quantity: Quantity {
            container_number: line.container_number,
            container_type: Code::new(&line.container_type),
            quantity: line.quantity.clone(),
            unit_of_measurement: Code::new(&line.unit_of_measurement),
        },
        hazardous_waste: HazardousWaste {
            federal_waste_codes: wrap_codes(&line.federal_waste_codes),
            generator_state_waste_codes: non_empty(&line.generator_waste_codes).map(wrap_codes),
            tsdf_state_waste_codes: non_empty(&line.tsdf_waste_codes).map(wrap_codes),
            tx_waste_codes: non_empty(&line.tx_waste_codes).map(<[String]>::to_vec),
        },
        management_method: line
            .management_method_code
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(Code::new),
        additional_info: AdditionalInfo::new(&line.comments, line.handling_instructions.as_deref()),
        br_info,
    }
}

/// `YYYY-MM-DD` → `YYYY-MM-DDT12:00:00.000Z`.
pub fn ship_date_instant(date: &str) -> Option<String> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let noon = day.and_hms_opt(12, 0, 0)?;
    Some(
        Utc.from_utc_datetime(&noon)
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

fn wrap_codes(codes: &[String]) -> Vec<Code> {
    codes.iter().map(Code::new).collect()
}

fn non_empty(codes: &[String]) -> Option<&[String]> {
    (!codes.is_empty()).then_some(codes)
}
