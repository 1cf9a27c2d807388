//! Constantes del motor core.
//!
//! Valores estáticos que participan en el cálculo de cache keys. Cambiarlos
//! invalida todas las ejecuciones cacheadas previas.

/// Versión lógica del motor. Forma parte de toda cache key: un cambio de
/// versión fuerza la re-ejecución aunque definición y datos no cambien.
pub const ENGINE_VERSION: &str = "P1.0";

/// Nombre del directorio de sistema dentro del directorio de cada componente.
pub const SYSTEM_DIR: &str = ".system";

/// Subdirectorio (bajo `SYSTEM_DIR`) con un directorio por ejecución registrada.
pub const EXECUTIONS_DIR: &str = "executions";

/// Archivo con el payload JSON de un artifact fresco.
pub const PAYLOAD_FILE: &str = "payload.json";

/// Archivo resumen escrito en el directorio de cada ejecución.
pub const EXECUTION_RECORD_FILE: &str = "execution.json";
