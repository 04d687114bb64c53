//! Recognized spreadsheet headers for every canonical field.
//!
//! Fields are listed in declaration order and aliases in priority order;
//! the mapper relies on both.

use std::sync::LazyLock;

use atril_core::Field;
use atril_core::text::normalize;

pub const FIELD_ALIASES: &[(Field, &[&str])] = &[
    (
        Field::Instrumento,
        &["instrumento", "item", "descripcion del instrumento", "nombre del instrumento"],
    ),
    (Field::Familia, &["familia", "seccion", "categoria", "grupo"]),
    (Field::Marca, &["marca", "brand", "fabricante"]),
    (Field::Estado, &["estado", "condicion", "status"]),
    (Field::Modelo, &["modelo", "model"]),
    (Field::Medida, &["medida", "talla"]),
    (Field::Medidas, &["medidas"]),
    (Field::Serie, &["serie", "serial", "nro de serie"]),
    (Field::TipoCase, &["case", "estuche"]),
    (Field::Accesorios, &["accesorios"]),
    (Field::Soporte, &["soporte"]),
    (Field::Limpio, &["limpio"]),
    (Field::Responsable, &["monitor", "responsable"]),
    (
        Field::Estudiante,
        &["estudiante", "alumno", "nombre del alumno", "nombre"],
    ),
    (Field::Curso, &["curso", "grado"]),
    (Field::Observaciones, &["observaciones", "notes"]),
    (Field::Ubicacion, &["ubicacion", "sala"]),
    (Field::Prestado, &["prestado", "hogar"]),
    (Field::FechaSalida, &["fecha de salida"]),
    (Field::HoraSalida, &["hora de salida"]),
    (Field::FechaRetorno, &["fecha de retorno"]),
];

/// [`FIELD_ALIASES`] with every alias already normalized.
pub(crate) static NORMALIZED_ALIASES: LazyLock<Vec<(Field, Vec<String>)>> = LazyLock::new(|| {
    FIELD_ALIASES
        .iter()
        .map(|(field, aliases)| (*field, aliases.iter().map(normalize).collect()))
        .collect()
});
