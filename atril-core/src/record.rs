//! Inventory record types: one row per physical instrument.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::condition::{ConditionCategory, classify_opt};
use crate::loan::is_loaned_opt;
use crate::serde_ids::{de_id, de_metadata};
use crate::text::{is_blank, normalize_opt};

/// Canonical inventory columns, in declaration order.
///
/// The order matters: column mapping scans fields in this order and the
/// first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    Instrumento,
    Familia,
    Marca,
    Estado,
    Modelo,
    Medida,
    Medidas,
    Serie,
    TipoCase,
    Accesorios,
    Soporte,
    Limpio,
    Responsable,
    Estudiante,
    Curso,
    Observaciones,
    Ubicacion,
    Prestado,
    FechaSalida,
    HoraSalida,
    FechaRetorno,
}

impl Field {
    pub const ALL: [Field; 21] = [
        Field::Instrumento,
        Field::Familia,
        Field::Marca,
        Field::Estado,
        Field::Modelo,
        Field::Medida,
        Field::Medidas,
        Field::Serie,
        Field::TipoCase,
        Field::Accesorios,
        Field::Soporte,
        Field::Limpio,
        Field::Responsable,
        Field::Estudiante,
        Field::Curso,
        Field::Observaciones,
        Field::Ubicacion,
        Field::Prestado,
        Field::FechaSalida,
        Field::HoraSalida,
        Field::FechaRetorno,
    ];

    /// Wire/column name of the field.
    pub fn name(&self) -> &'static str {
        match self {
            Field::Instrumento => "Instrumento",
            Field::Familia => "Familia",
            Field::Marca => "Marca",
            Field::Estado => "Estado",
            Field::Modelo => "Modelo",
            Field::Medida => "Medida",
            Field::Medidas => "Medidas",
            Field::Serie => "Serie",
            Field::TipoCase => "TipoCase",
            Field::Accesorios => "Accesorios",
            Field::Soporte => "Soporte",
            Field::Limpio => "Limpio",
            Field::Responsable => "Responsable",
            Field::Estudiante => "Estudiante",
            Field::Curso => "Curso",
            Field::Observaciones => "Observaciones",
            Field::Ubicacion => "Ubicacion",
            Field::Prestado => "Prestado",
            Field::FechaSalida => "FechaSalida",
            Field::HoraSalida => "HoraSalida",
            Field::FechaRetorno => "FechaRetorno",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One physical instrument.
///
/// Every attribute is free text straight from the spreadsheet; nothing is
/// coerced. Columns that matched no canonical field land in `metadata`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(rename = "Instrumento", default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
    #[serde(rename = "Familia", default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(rename = "Marca", default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(rename = "Estado", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(rename = "Modelo", default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "Medida", default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(rename = "Medidas", default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<String>,
    #[serde(rename = "Serie", default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(rename = "TipoCase", default, skip_serializing_if = "Option::is_none")]
    pub case_type: Option<String>,
    #[serde(rename = "Accesorios", default, skip_serializing_if = "Option::is_none")]
    pub accessories: Option<String>,
    #[serde(rename = "Soporte", default, skip_serializing_if = "Option::is_none")]
    pub stand: Option<String>,
    #[serde(rename = "Limpio", default, skip_serializing_if = "Option::is_none")]
    pub cleaned: Option<String>,
    #[serde(rename = "Responsable", default, skip_serializing_if = "Option::is_none")]
    pub monitor: Option<String>,
    #[serde(rename = "Estudiante", default, skip_serializing_if = "Option::is_none")]
    pub student: Option<String>,
    #[serde(rename = "Curso", default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(rename = "Observaciones", default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    #[serde(rename = "Ubicacion", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "Prestado", default, skip_serializing_if = "Option::is_none")]
    pub loaned: Option<String>,
    #[serde(rename = "FechaSalida", default, skip_serializing_if = "Option::is_none")]
    pub checkout_date: Option<String>,
    #[serde(rename = "HoraSalida", default, skip_serializing_if = "Option::is_none")]
    pub checkout_time: Option<String>,
    #[serde(rename = "FechaRetorno", default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<String>,
    /// Overflow bag: original column name -> raw value.
    #[serde(default, deserialize_with = "de_metadata", skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl InventoryRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        *self.slot_mut(field) = Some(value.into());
        self
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        *self.slot_mut(field) = Some(value.into());
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Instrumento => &self.instrument,
            Field::Familia => &self.family,
            Field::Marca => &self.brand,
            Field::Estado => &self.condition,
            Field::Modelo => &self.model,
            Field::Medida => &self.size,
            Field::Medidas => &self.sizes,
            Field::Serie => &self.serial,
            Field::TipoCase => &self.case_type,
            Field::Accesorios => &self.accessories,
            Field::Soporte => &self.stand,
            Field::Limpio => &self.cleaned,
            Field::Responsable => &self.monitor,
            Field::Estudiante => &self.student,
            Field::Curso => &self.course,
            Field::Observaciones => &self.observations,
            Field::Ubicacion => &self.location,
            Field::Prestado => &self.loaned,
            Field::FechaSalida => &self.checkout_date,
            Field::HoraSalida => &self.checkout_time,
            Field::FechaRetorno => &self.return_date,
        }
    }

    pub fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Instrumento => &mut self.instrument,
            Field::Familia => &mut self.family,
            Field::Marca => &mut self.brand,
            Field::Estado => &mut self.condition,
            Field::Modelo => &mut self.model,
            Field::Medida => &mut self.size,
            Field::Medidas => &mut self.sizes,
            Field::Serie => &mut self.serial,
            Field::TipoCase => &mut self.case_type,
            Field::Accesorios => &mut self.accessories,
            Field::Soporte => &mut self.stand,
            Field::Limpio => &mut self.cleaned,
            Field::Responsable => &mut self.monitor,
            Field::Estudiante => &mut self.student,
            Field::Curso => &mut self.course,
            Field::Observaciones => &mut self.observations,
            Field::Ubicacion => &mut self.location,
            Field::Prestado => &mut self.loaned,
            Field::FechaSalida => &mut self.checkout_date,
            Field::HoraSalida => &mut self.checkout_time,
            Field::FechaRetorno => &mut self.return_date,
        }
    }

    /// Instrument name, empty when missing.
    pub fn instrument_name(&self) -> &str {
        self.instrument.as_deref().unwrap_or_default()
    }

    pub fn has_student(&self) -> bool {
        !is_blank(self.student.as_deref())
    }

    /// Present rows have an instrument or a student and are not a
    /// spreadsheet "total" footer.
    pub fn is_present(&self) -> bool {
        let has_instrument = !is_blank(self.instrument.as_deref());
        (has_instrument || self.has_student()) && normalize_opt(self.instrument.as_deref()) != "total"
    }

    pub fn is_loaned(&self) -> bool {
        is_loaned_opt(self.loaned.as_deref())
    }

    pub fn condition_category(&self) -> ConditionCategory {
        classify_opt(self.condition.as_deref())
    }
}
