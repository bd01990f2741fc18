//! Search category allow-lists.
//!
//! Category names are spliced into SQL text, so they are only ever taken from
//! the static column expressions below. User input selects a variant; it never
//! reaches the query itself.

use crate::errors::{Error, Result};

/// A closed set of searchable columns for one endpoint.
pub trait SearchCategory: Copy + Sized + 'static {
    /// Every accepted category, in the order they are documented.
    const ALL: &'static [Self];

    /// Category name as accepted in the `searchCategory` parameter.
    fn name(self) -> &'static str;

    /// Column expression used in the WHERE clause.
    fn column(self) -> &'static str;

    fn parse(raw: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name() == raw)
            .ok_or_else(|| Error::InvalidCategory(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TelemetryField {
    #[default]
    TelematicsId,
    H2genId,
    FuelLifetime,
    FuelTelematics,
    Odometer,
    EngineSpeed,
    Latitude,
    Longitude,
    Runtime,
    Speed,
    Id,
}

impl SearchCategory for TelemetryField {
    const ALL: &'static [Self] = &[
        TelemetryField::TelematicsId,
        TelemetryField::H2genId,
        TelemetryField::FuelLifetime,
        TelemetryField::FuelTelematics,
        TelemetryField::Odometer,
        TelemetryField::EngineSpeed,
        TelemetryField::Latitude,
        TelemetryField::Longitude,
        TelemetryField::Runtime,
        TelemetryField::Speed,
        TelemetryField::Id,
    ];

    fn name(self) -> &'static str {
        match self {
            TelemetryField::TelematicsId => "telematics_id",
            TelemetryField::H2genId => "h2gen_id",
            TelemetryField::FuelLifetime => "fuel_lifetime",
            TelemetryField::FuelTelematics => "fuel_telematics",
            TelemetryField::Odometer => "odometer",
            TelemetryField::EngineSpeed => "engine_speed",
            TelemetryField::Latitude => "latitude",
            TelemetryField::Longitude => "longitude",
            TelemetryField::Runtime => "runtime",
            TelemetryField::Speed => "speed",
            TelemetryField::Id => "id",
        }
    }

    fn column(self) -> &'static str {
        match self {
            TelemetryField::TelematicsId => "tu.telematics_id",
            TelemetryField::H2genId => "tu.h2gen_id",
            TelemetryField::FuelLifetime => "tu.fuel_lifetime",
            TelemetryField::FuelTelematics => "tu.fuel_telematics",
            TelemetryField::Odometer => "tu.odometer",
            TelemetryField::EngineSpeed => "tu.engine_speed",
            TelemetryField::Latitude => "tu.latitude",
            TelemetryField::Longitude => "tu.longitude",
            TelemetryField::Runtime => "tu.runtime",
            TelemetryField::Speed => "tu.speed",
            TelemetryField::Id => "tu.id",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InventoryField {
    #[default]
    DeviceId,
    CustomerName,
    DealerName,
}

impl SearchCategory for InventoryField {
    const ALL: &'static [Self] = &[
        InventoryField::DeviceId,
        InventoryField::CustomerName,
        InventoryField::DealerName,
    ];

    fn name(self) -> &'static str {
        match self {
            InventoryField::DeviceId => "device_id",
            InventoryField::CustomerName => "customer_name",
            InventoryField::DealerName => "dealer_name",
        }
    }

    // Select aliases are not visible to WHERE, so use the joined columns.
    fn column(self) -> &'static str {
        match self {
            InventoryField::DeviceId => "tu.id",
            InventoryField::CustomerName => "o1.name",
            InventoryField::DealerName => "o2.name",
        }
    }
}

/// A validated substring search over one allow-listed column.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFilter<C> {
    pub category: C,
    pub term: String,
}

impl<C: SearchCategory> SearchFilter<C> {
    /// Validates `category` (or uses the endpoint default when absent) and
    /// returns `None` when there is nothing to search for.
    ///
    /// The category is checked even when the term is empty, so a bad category
    /// is always rejected before any query runs.
    pub fn from_params(term: Option<&str>, category: Option<&str>) -> Result<Option<Self>>
    where
        C: Default,
    {
        let category = match category.filter(|c| !c.is_empty()) {
            Some(raw) => C::parse(raw)?,
            None => C::default(),
        };

        Ok(term
            .filter(|t| !t.is_empty())
            .map(|t| SearchFilter {
                category,
                term: t.to_string(),
            }))
    }

    /// SQL condition with a single bind placeholder.
    pub fn condition(&self) -> String {
        format!("LOWER({}) LIKE LOWER(?)", self.category.column())
    }

    /// Bind value for [`SearchFilter::condition`].
    pub fn pattern(&self) -> String {
        format!("%{}%", self.term)
    }
}
