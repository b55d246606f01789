//! # Módulo de Configuración
//!
//! Una única configuración inmutable que se construye al arrancar y se pasa
//! explícitamente a cada componente. Puede cargarse desde:
//!
//! - un archivo TOML estructurado ([`SimulationConfig::from_toml_file`]);
//! - un archivo estilo `setup.env` con claves planas `CLAVE=valor`
//!   ([`SimulationConfig::from_env_file`]), donde las variables de entorno del
//!   proceso tienen prioridad sobre el archivo. Se aceptan comentarios `#`,
//!   el prefijo `export`, valores entre comillas y claves repetidas (gana la
//!   última). Un valor vacío cuenta como ausente.
//!
//! Toda carga termina en [`SimulationConfig::validate`], que aborta el arranque
//! ante valores faltantes o inválidos.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::car::FuelKind;
use crate::error::ConfigError;

/// Capacidad por defecto de la cola de cada surtidor.
pub const DEFAULT_STAND_BUFFER: usize = 2;

/// Capacidad por defecto de la cola de cada caja.
pub const DEFAULT_REGISTER_BUFFER: usize = 3;

/// Duración por defecto de una unidad abstracta de tiempo (milisegundos).
pub const DEFAULT_TIME_UNIT_MS: u64 = 1;

/// Capacidad de la cola de llegadas hacia el enrutador de surtidores.
pub const ARRIVALS_BUFFER: usize = 20;

/// Capacidad de la cola que une surtidores con el enrutador de cajas.
pub const PAYMENT_QUEUE_BUFFER: usize = 10;

/// Rango de duraciones `[min, max)` en unidades abstractas.
///
/// Un rango degenerado `[k, k]` siempre produce `k`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRange {
    pub min: u64,
    pub max: u64,
}

impl ServiceRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Sortea una duración uniforme en `[min, max)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use petrol_station_simulator::ServiceRange;
    ///
    /// let mut rng = rand::thread_rng();
    /// assert_eq!(ServiceRange::new(3, 3).sample(&mut rng), 3);
    /// let v = ServiceRange::new(1, 4).sample(&mut rng);
    /// assert!((1..4).contains(&v));
    /// ```
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.max <= self.min {
            self.min
        } else {
            rng.gen_range(self.min..self.max)
        }
    }

    /// Indica si `value` pudo haber salido de [`sample`](Self::sample).
    pub fn contains(&self, value: u64) -> bool {
        if self.max <= self.min {
            value == self.min
        } else {
            (self.min..self.max).contains(&value)
        }
    }

    fn check(&self, key: &str) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvertedRange {
                key: key.to_string(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    fn check_service(&self, key: &str) -> Result<(), ConfigError> {
        if self.min == 0 {
            return Err(ConfigError::Invalid {
                key: format!("{key}_MIN"),
                reason: "debe ser positivo".to_string(),
            });
        }
        self.check(key)
    }
}

/// Surtidores de un combustible: cantidad y tiempo de carga.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelStandConfig {
    pub count: usize,
    #[serde(flatten)]
    pub service: ServiceRange,
}

impl Default for FuelStandConfig {
    fn default() -> Self {
        Self {
            count: 0,
            service: ServiceRange::new(1, 1),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandsConfig {
    #[serde(default = "default_stand_buffer")]
    pub buffer: usize,
    pub gas: FuelStandConfig,
    pub diesel: FuelStandConfig,
    pub lpg: FuelStandConfig,
    pub electric: FuelStandConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistersConfig {
    pub count: usize,
    #[serde(default = "default_register_buffer")]
    pub buffer: usize,
    #[serde(flatten)]
    pub payment: ServiceRange,
}

/// Configuración completa de una corrida.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub car_count: usize,
    pub arrival: ServiceRange,
    pub stands: StandsConfig,
    pub registers: RegistersConfig,
    #[serde(default = "default_time_unit_ms")]
    pub time_unit_ms: u64,
    /// Semilla para reproducir una corrida; sin semilla se usa entropía.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_stand_buffer() -> usize {
    DEFAULT_STAND_BUFFER
}

fn default_register_buffer() -> usize {
    DEFAULT_REGISTER_BUFFER
}

fn default_time_unit_ms() -> u64 {
    DEFAULT_TIME_UNIT_MS
}

impl Default for SimulationConfig {
    /// Valores de referencia de la estación: 100 autos, 6 surtidores y 2 cajas.
    fn default() -> Self {
        Self {
            car_count: 100,
            arrival: ServiceRange::new(1, 2),
            stands: StandsConfig {
                buffer: DEFAULT_STAND_BUFFER,
                gas: FuelStandConfig { count: 2, service: ServiceRange::new(1, 4) },
                diesel: FuelStandConfig { count: 2, service: ServiceRange::new(2, 5) },
                lpg: FuelStandConfig { count: 1, service: ServiceRange::new(5, 12) },
                electric: FuelStandConfig { count: 1, service: ServiceRange::new(10, 21) },
            },
            registers: RegistersConfig {
                count: 2,
                buffer: DEFAULT_REGISTER_BUFFER,
                payment: ServiceRange::new(1, 7),
            },
            time_unit_ms: DEFAULT_TIME_UNIT_MS,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn fuel(&self, kind: FuelKind) -> &FuelStandConfig {
        match kind {
            FuelKind::Gas => &self.stands.gas,
            FuelKind::Diesel => &self.stands.diesel,
            FuelKind::Lpg => &self.stands.lpg,
            FuelKind::Electric => &self.stands.electric,
        }
    }

    pub fn fuel_mut(&mut self, kind: FuelKind) -> &mut FuelStandConfig {
        match kind {
            FuelKind::Gas => &mut self.stands.gas,
            FuelKind::Diesel => &mut self.stands.diesel,
            FuelKind::Lpg => &mut self.stands.lpg,
            FuelKind::Electric => &mut self.stands.electric,
        }
    }

    /// Combustibles con al menos un surtidor; son los únicos que se sortean
    /// para los autos que llegan.
    pub fn served_fuel_kinds(&self) -> Vec<FuelKind> {
        FuelKind::ALL
            .into_iter()
            .filter(|kind| self.fuel(*kind).count > 0)
            .collect()
    }

    pub fn stand_count(&self) -> usize {
        FuelKind::ALL.iter().map(|kind| self.fuel(*kind).count).sum()
    }

    /// Duración real de una unidad abstracta de tiempo.
    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }

    /// Convierte `units` unidades abstractas a tiempo real.
    pub fn units_to_duration(&self, units: u64) -> Duration {
        Duration::from_millis(self.time_unit_ms.saturating_mul(units))
    }

    /// Generador aleatorio para un hilo de la simulación.
    ///
    /// Con semilla, cada `stream` produce una secuencia reproducible e
    /// independiente de las demás; sin semilla se usa entropía del sistema.
    pub fn rng_for(&self, stream: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            None => StdRng::from_entropy(),
        }
    }

    /// Valida la configuración y la devuelve si es utilizable.
    ///
    /// Se aceptan cero autos, escalonamiento cero y combustibles sin
    /// surtidores (esos combustibles simplemente no llegan); todo lo demás
    /// debe ser positivo.
    ///
    /// # Errors
    ///
    /// El primer [`ConfigError`] encontrado.
    pub fn validate(self) -> Result<Self, ConfigError> {
        self.arrival.check("ARRIVAL")?;

        for kind in FuelKind::ALL {
            let fuel = self.fuel(kind);
            if fuel.count > 0 {
                fuel.service.check_service(&format!("{}_SERVE_TIME", env_prefix(kind)))?;
            }
        }
        if self.stand_count() == 0 {
            return Err(ConfigError::NoStands);
        }

        positive("STAND_BUFFER", self.stands.buffer as u64)?;
        positive("REGISTER_COUNT", self.registers.count as u64)?;
        positive("REGISTER_BUFFER", self.registers.buffer as u64)?;
        self.registers.payment.check_service("REGISTER_HANDLE_TIME")?;
        positive("TIME_UNIT_MS", self.time_unit_ms)?;

        Ok(self)
    }

    /// Lee una configuración TOML estructurada.
    ///
    /// ```toml
    /// car_count = 100
    /// arrival = { min = 1, max = 2 }
    ///
    /// [stands]
    /// buffer = 2
    /// gas = { count = 2, min = 1, max = 4 }
    /// diesel = { count = 2, min = 2, max = 5 }
    /// lpg = { count = 1, min = 5, max = 12 }
    /// electric = { count = 0, min = 10, max = 21 }
    ///
    /// [registers]
    /// count = 2
    /// min = 1
    /// max = 7
    /// ```
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: SimulationConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            file: origin.to_path_buf(),
            detail: e.to_string(),
        })?;
        config.validate()
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content, path)
    }

    /// Lee un archivo `setup.env` (`CAR_COUNT=100`, `GAS_COUNT=2`, …).
    ///
    /// Las variables de entorno del proceso con la misma clave tienen
    /// prioridad sobre el archivo.
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let vars = parse_env_file(&content, path)?;
        Self::from_env_lookup(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| vars.get(key).cloned())
                .filter(|value| !value.trim().is_empty())
        })
    }

    /// Construye la configuración consultando cada clave con `lookup`.
    pub fn from_env_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = SimulationConfig {
            car_count: read_required(&lookup, "CAR_COUNT")? as usize,
            arrival: ServiceRange::new(
                read_required(&lookup, "ARRIVAL_MIN")?,
                read_required(&lookup, "ARRIVAL_MAX")?,
            ),
            stands: StandsConfig {
                buffer: read_optional(&lookup, "STAND_BUFFER", DEFAULT_STAND_BUFFER as u64)? as usize,
                gas: FuelStandConfig::default(),
                diesel: FuelStandConfig::default(),
                lpg: FuelStandConfig::default(),
                electric: FuelStandConfig::default(),
            },
            registers: RegistersConfig {
                count: read_required(&lookup, "REGISTER_COUNT")? as usize,
                buffer: read_optional(&lookup, "REGISTER_BUFFER", DEFAULT_REGISTER_BUFFER as u64)? as usize,
                payment: ServiceRange::new(
                    read_required(&lookup, "REGISTER_HANDLE_TIME_MIN")?,
                    read_required(&lookup, "REGISTER_HANDLE_TIME_MAX")?,
                ),
            },
            time_unit_ms: read_optional(&lookup, "TIME_UNIT_MS", DEFAULT_TIME_UNIT_MS)?,
            seed: match lookup("SEED") {
                Some(_) => Some(read_required(&lookup, "SEED")?),
                None => None,
            },
        };

        for kind in FuelKind::ALL {
            let prefix = env_prefix(kind);
            *config.fuel_mut(kind) = FuelStandConfig {
                count: read_required(&lookup, &format!("{prefix}_COUNT"))? as usize,
                service: ServiceRange::new(
                    read_required(&lookup, &format!("{prefix}_SERVE_TIME_MIN"))?,
                    read_required(&lookup, &format!("{prefix}_SERVE_TIME_MAX"))?,
                ),
            };
        }

        config.validate()
    }
}

fn env_prefix(kind: FuelKind) -> &'static str {
    match kind {
        FuelKind::Gas => "GAS",
        FuelKind::Diesel => "DIESEL",
        FuelKind::Lpg => "LPG",
        FuelKind::Electric => "ELECTRIC",
    }
}

fn positive(key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            key: key.to_string(),
            reason: "debe ser positivo".to_string(),
        });
    }
    Ok(())
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    let raw = raw.trim();
    raw.parse::<u64>().map_err(|_| {
        let negative = raw.strip_prefix('-').is_some_and(|digits| digits.parse::<u64>().is_ok());
        ConfigError::Invalid {
            key: key.to_string(),
            reason: if negative {
                format!("{raw} no puede ser negativo")
            } else {
                format!("'{raw}' no es un entero")
            },
        }
    })
}

fn read_required<F>(lookup: &F, key: &str) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).ok_or_else(|| ConfigError::Missing { key: key.to_string() })?;
    parse_u64(key, &raw)
}

fn read_optional<F>(lookup: &F, key: &str, fallback: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse_u64(key, &raw),
        None => Ok(fallback),
    }
}

/// Lee líneas `CLAVE=valor` al estilo dotenv.
fn parse_env_file(content: &str, origin: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let mut vars = HashMap::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").map_or(line, str::trim_start);

        let (key, value) = line
            .split_once('=')
            .map(|(k, v)| (k.trim(), v.trim()))
            .filter(|(k, _)| !k.is_empty())
            .ok_or_else(|| ConfigError::Parse {
                file: origin.to_path_buf(),
                detail: format!("línea {}: se esperaba CLAVE=valor", number + 1),
            })?;

        vars.insert(key.to_string(), unquote(value).to_string());
    }
    Ok(vars)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote)) {
            return inner;
        }
    }
    // Comentario al final de un valor sin comillas.
    value.split_once(" #").map_or(value, |(v, _)| v.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETUP_ENV: &str = "\
# llegada de autos
ARRIVAL_MIN=1
ARRIVAL_MAX=2
CAR_COUNT=100
GAS_COUNT=2
GAS_SERVE_TIME_MIN=1
GAS_SERVE_TIME_MAX=4
DIESEL_COUNT=2
DIESEL_SERVE_TIME_MIN=2
DIESEL_SERVE_TIME_MAX=5
LPG_COUNT=1
LPG_SERVE_TIME_MIN=5
LPG_SERVE_TIME_MAX=12
ELECTRIC_COUNT=1
ELECTRIC_SERVE_TIME_MIN=10
ELECTRIC_SERVE_TIME_MAX=21
REGISTER_COUNT=2
REGISTER_HANDLE_TIME_MIN=1
REGISTER_HANDLE_TIME_MAX=7
";

    fn env_map(content: &str) -> HashMap<String, String> {
        parse_env_file(content, Path::new("setup.env")).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulationConfig::default().validate().unwrap();
        assert_eq!(config.stand_count(), 6);
        assert_eq!(config.served_fuel_kinds(), FuelKind::ALL.to_vec());
    }

    #[test]
    fn test_env_lookup_matches_defaults() {
        let map = env_map(SETUP_ENV);
        let config = SimulationConfig::from_env_lookup(|k| map.get(k).cloned()).unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn test_env_missing_key_fails_fast() {
        let mut map = env_map(SETUP_ENV);
        map.remove("REGISTER_COUNT");
        let err = SimulationConfig::from_env_lookup(|k| map.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key } if key == "REGISTER_COUNT"));
    }

    #[test]
    fn test_env_negative_value_rejected() {
        let mut map = env_map(SETUP_ENV);
        map.insert("GAS_COUNT".to_string(), "-1".to_string());
        let err = SimulationConfig::from_env_lookup(|k| map.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == "GAS_COUNT"));
    }

    #[test]
    fn test_env_garbage_value_rejected() {
        let mut map = env_map(SETUP_ENV);
        map.insert("CAR_COUNT".to_string(), "muchos".to_string());
        let err = SimulationConfig::from_env_lookup(|k| map.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == "CAR_COUNT"));
    }

    #[test]
    fn test_env_optional_buffers() {
        let mut map = env_map(SETUP_ENV);
        map.insert("STAND_BUFFER".to_string(), "4".to_string());
        map.insert("SEED".to_string(), "7".to_string());
        let config = SimulationConfig::from_env_lookup(|k| map.get(k).cloned()).unwrap();
        assert_eq!(config.stands.buffer, 4);
        assert_eq!(config.registers.buffer, DEFAULT_REGISTER_BUFFER);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_env_file_accepts_dotenv_lines() {
        let content = "\
export CAR_COUNT=5
CAR_COUNT=010
SEED=
GAS_COUNT=\"2\"
LPG_COUNT='1'
DIESEL_COUNT=3 # dos más una de reserva
";
        let map = env_map(content);
        assert_eq!(map["CAR_COUNT"], "010");
        assert_eq!(map["SEED"], "");
        assert_eq!(map["GAS_COUNT"], "2");
        assert_eq!(map["LPG_COUNT"], "1");
        assert_eq!(map["DIESEL_COUNT"], "3");
        assert_eq!(parse_u64("CAR_COUNT", &map["CAR_COUNT"]).unwrap(), 10);
    }

    #[test]
    fn test_env_file_rejects_line_without_equals() {
        let err = parse_env_file("CAR_COUNT=1\nGAS_COUNT\n", Path::new("setup.env")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { detail, .. } if detail.contains("línea 2")));
    }

    #[test]
    fn test_env_file_empty_seed_means_entropy() {
        let path = std::env::temp_dir().join(format!("petrol-station-{}.env", std::process::id()));
        std::fs::write(&path, format!("{SETUP_ENV}SEED=\n")).unwrap();
        let config = SimulationConfig::from_env_file(&path);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.unwrap().seed, None);
    }

    #[test]
    fn test_seed_uses_full_u64_range() {
        let mut map = env_map(SETUP_ENV);
        map.insert("SEED".to_string(), u64::MAX.to_string());
        let config = SimulationConfig::from_env_lookup(|k| map.get(k).cloned()).unwrap();
        assert_eq!(config.seed, Some(u64::MAX));
    }

    #[test]
    fn test_zero_register_buffer_rejected() {
        let mut config = SimulationConfig::default();
        config.registers.buffer = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { key, .. }) if key == "REGISTER_BUFFER"));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut config = SimulationConfig::default();
        config.stands.diesel.service = ServiceRange::new(5, 2);
        assert!(matches!(config.validate(), Err(ConfigError::InvertedRange { .. })));
    }

    #[test]
    fn test_no_stands_rejected() {
        let mut config = SimulationConfig::default();
        for kind in FuelKind::ALL {
            config.fuel_mut(kind).count = 0;
        }
        assert!(matches!(config.validate(), Err(ConfigError::NoStands)));
    }

    #[test]
    fn test_zero_payment_min_rejected() {
        let mut config = SimulationConfig::default();
        config.registers.payment = ServiceRange::new(0, 3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_config() {
        let content = r#"
car_count = 5
arrival = { min = 0, max = 0 }
seed = 11

[stands]
gas = { count = 1, min = 1, max = 1 }
diesel = { count = 0, min = 1, max = 1 }
lpg = { count = 0, min = 1, max = 1 }
electric = { count = 0, min = 1, max = 1 }

[registers]
count = 1
min = 1
max = 1
"#;
        let config = SimulationConfig::from_toml_str(content, Path::new("station.toml")).unwrap();
        assert_eq!(config.car_count, 5);
        assert_eq!(config.stands.buffer, DEFAULT_STAND_BUFFER);
        assert_eq!(config.registers.buffer, DEFAULT_REGISTER_BUFFER);
        assert_eq!(config.served_fuel_kinds(), vec![FuelKind::Gas]);
        assert_eq!(config.time_unit(), Duration::from_millis(1));
    }

    #[test]
    fn test_toml_omitted_fuel_is_rejected() {
        let content = r#"
car_count = 5
arrival = { min = 0, max = 0 }

[stands]
gas = { count = 1, min = 1, max = 1 }

[registers]
count = 1
min = 1
max = 1
"#;
        let err = SimulationConfig::from_toml_str(content, Path::new("station.toml")).unwrap_err();
        match err {
            ConfigError::Parse { detail, .. } => assert!(detail.contains("diesel"), "{detail}"),
            other => panic!("se esperaba error de formato, llegó {other:?}"),
        }
    }

    #[test]
    fn test_toml_missing_section_is_parse_error() {
        let err = SimulationConfig::from_toml_str("car_count = 5", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_range_sampling() {
        let mut rng = rand::thread_rng();
        let range = ServiceRange::new(2, 5);
        for _ in 0..100 {
            assert!(range.contains(range.sample(&mut rng)));
        }
        assert!(!range.contains(5));
        assert!(ServiceRange::new(1, 1).contains(1));
    }
}
