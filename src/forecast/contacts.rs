//! Contact projection
//!
//! At a solved pressure the reservoir voidage F is made good by the drive
//! mechanisms in proportion to what each one supplies. The gas-cap share
//! moves the GOC, the aquifer share moves the OWC, both converted to depth
//! through the hydrocarbon pore volume per foot.

use crate::material_balance::{Expansion, InitialConditions};
use crate::types::{DriveModel, DriveParameters, ReservoirMetadata};

/// Expansion supplied by each mechanism, in reservoir barrels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExpansionSupply {
    /// Oil plus dissolved gas, N·Eo
    pub oil: f64,
    /// Gas cap, N·m·Eg
    pub gas_cap: f64,
    /// Connate water and pore compaction, N·Efw
    pub rock_water: f64,
    /// Aquifer influx We
    pub influx: f64,
}

impl ExpansionSupply {
    /// Terms the fitted model accounts for. `None` for the gas model, which
    /// balances on p/z instead of expansion.
    pub fn for_model(
        model: DriveModel,
        parameters: &DriveParameters,
        initial: &InitialConditions,
        expansion: &Expansion,
        pressure: f64,
    ) -> Option<Self> {
        let n = parameters.n?;
        let supply = match model {
            DriveModel::Volumetric => ExpansionSupply {
                oil: n * expansion.eo,
                ..Default::default()
            },
            DriveModel::GasCap => ExpansionSupply {
                oil: n * expansion.eo,
                gas_cap: n * parameters.m.unwrap_or(0.0) * expansion.eg,
                ..Default::default()
            },
            DriveModel::Water => ExpansionSupply {
                rock_water: n * expansion.efw,
                influx: aquifer_influx(parameters, initial.pi - pressure),
                ..Default::default()
            },
            DriveModel::Solution => ExpansionSupply {
                oil: n * expansion.eo,
                gas_cap: n * expansion.eg,
                rock_water: n * expansion.efw,
                influx: 0.0,
            },
            DriveModel::Gas => return None,
        };
        Some(supply)
    }

    pub fn total(&self) -> f64 {
        self.oil + self.gas_cap + self.rock_water + self.influx
    }
}

/// Pot aquifer We = U·ΔP; falls back to the fitted constant influx when U
/// could not be derived.
fn aquifer_influx(parameters: &DriveParameters, delta_p: f64) -> f64 {
    match (parameters.u, parameters.we) {
        (Some(u), _) => u * delta_p,
        (None, Some(we)) => we,
        (None, None) => 0.0,
    }
}

/// Projected fluid contacts (ft, same datum as the metadata)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactState {
    pub goc_ft: f64,
    pub owc_ft: f64,
}

impl ContactState {
    pub fn initial(metadata: &ReservoirMetadata) -> Self {
        Self {
            goc_ft: metadata.goc0_ft,
            owc_ft: metadata.owc0_ft,
        }
    }

    pub fn crossed(&self) -> bool {
        self.goc_ft > self.owc_ft
    }
}

/// Move the contacts for `voidage_rb` of withdrawal. Not clamped: a
/// projection past the opposing contact is reported by the caller.
pub fn project_contacts(
    metadata: &ReservoirMetadata,
    voidage_rb: f64,
    supply: &ExpansionSupply,
) -> ContactState {
    let total = supply.total();
    let per_ft = metadata.hydrocarbon_pore_volume_per_ft();
    if total <= 0.0 || per_ft <= 0.0 {
        return ContactState::initial(metadata);
    }

    let delta_goc = voidage_rb * (supply.gas_cap / total) / per_ft;
    let delta_owc = voidage_rb * (supply.influx / total) / per_ft;
    ContactState {
        goc_ft: metadata.goc0_ft - delta_goc,
        owc_ft: metadata.owc0_ft - delta_owc,
    }
}
