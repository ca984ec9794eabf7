//! # lfcconfig - Configuration YAML centralisée pour LofiCast
//!
//! Cette crate fournit la configuration globale du serveur radio :
//! - Valeurs par défaut intégrées au binaire
//! - Premier fichier lisible parmi les emplacements candidats (variable
//!   `LOFICAST_CONFIG`, répertoire courant, home)
//! - Surcharge par variables d'environnement `LOFICAST_CONFIG__*`
//! - Persistance automatique des valeurs par défaut
//!
//! L'arbre de configuration est un [`serde_yaml::Value`] dont toutes les
//! clés sont normalisées en minuscules. Chaque source (fichier, env,
//! écriture applicative) est appliquée comme un *patch* fusionné par
//! [`overlay`] : la crate n'a qu'un seul chemin de code pour combiner des
//! configurations, quelle qu'en soit l'origine.
//!
//! Les autres crates étendent [`Config`] via des traits d'extension
//! (pattern `ConfigExt`) plutôt que d'ajouter leurs clés ici.

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{Context as _, Result};
use once_cell::sync::Lazy;
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("loficast.yaml");

const ENV_CONFIG_FILE: &str = "LOFICAST_CONFIG";
const ENV_PREFIX: &str = "LOFICAST_CONFIG__";

/// Port HTTP par défaut
pub const DEFAULT_HTTP_PORT: u16 = 3000;

static CONFIG: Lazy<Arc<Config>> =
    Lazy::new(|| Arc::new(Config::load().expect("Failed to load LofiCast configuration")));

/// Retourne l'instance globale
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Configuration du serveur, partagée entre toutes les crates.
pub struct Config {
    /// Fichier où persister ; `None` si aucun emplacement n'est inscriptible
    save_path: Option<PathBuf>,
    tree: Mutex<Value>,
}

impl Config {
    /// Charge la configuration complète : défauts intégrés, puis premier
    /// fichier candidat lisible, puis surcharges d'environnement.
    pub fn load() -> Result<Self> {
        let defaults: Value =
            serde_yaml::from_str(DEFAULT_CONFIG).context("Embedded defaults are invalid YAML")?;
        let mut tree = overlay(Value::Mapping(Mapping::new()), defaults);

        let mut loaded_from = None;
        for candidate in candidate_files() {
            let Ok(text) = fs::read_to_string(&candidate) else {
                continue;
            };
            let patch: Value = serde_yaml::from_str(&text)
                .with_context(|| format!("{} is not valid YAML", candidate.display()))?;
            info!(config_file = %candidate.display(), "Configuration file loaded");
            tree = overlay(tree, patch);
            loaded_from = Some(candidate);
            break;
        }
        if loaded_from.is_none() {
            info!("No configuration file found, using embedded defaults");
        }

        tree = overlay(tree, env_overrides());

        let save_path = loaded_from
            .into_iter()
            .chain(candidate_files())
            .find(|path| is_writable(path));
        if save_path.is_none() {
            warn!("No writable location for the configuration, changes will not persist");
        }

        let config = Self {
            save_path,
            tree: Mutex::new(tree),
        };
        config.persist();
        Ok(config)
    }

    /// Lit la valeur au chemin pointé (clés insensibles à la casse).
    pub fn get(&self, path: &[&str]) -> Option<Value> {
        let tree = self.tree.lock().unwrap();
        let mut node = &*tree;
        for key in path {
            let Value::Mapping(map) = node else {
                return None;
            };
            node = map.get(&Value::String(key.to_lowercase()))?;
        }
        Some(node.clone())
    }

    /// Dépose une valeur au chemin pointé, puis persiste sur disque.
    ///
    /// L'écriture passe par le même mécanisme de patch que le chargement :
    /// la valeur est emballée dans un mapping imbriqué puis fusionnée.
    pub fn set(&self, path: &[&str], value: Value) {
        {
            let mut tree = self.tree.lock().unwrap();
            let current = std::mem::take(&mut *tree);
            *tree = overlay(current, nest(path, value));
        }
        self.persist();
    }

    /// Écrit l'arbre courant dans le fichier de sauvegarde. Sans
    /// emplacement inscriptible, la configuration reste en mémoire.
    fn persist(&self) {
        let Some(path) = &self.save_path else {
            return;
        };
        let tree = self.tree.lock().unwrap();
        match serde_yaml::to_string(&*tree) {
            Ok(yaml) => {
                if let Err(err) = fs::write(path, yaml) {
                    warn!(config_file = %path.display(), %err, "Cannot write configuration");
                }
            }
            Err(err) => warn!(%err, "Cannot serialize configuration"),
        }
    }

    /// URL de base annoncée aux clients
    pub fn get_base_url(&self) -> String {
        match self.get(&["host", "base_url"]) {
            Some(Value::String(url)) if !url.is_empty() => url,
            _ => format!("http://localhost:{}", self.get_http_port()),
        }
    }

    /// Port d'écoute HTTP
    pub fn get_http_port(&self) -> u16 {
        match self.get(&["host", "http_port"]) {
            Some(Value::Number(n)) => match n.as_u64().and_then(|p| u16::try_from(p).ok()) {
                Some(port) => port,
                None => {
                    warn!(value = %n, "HTTP port out of range, using default");
                    DEFAULT_HTTP_PORT
                }
            },
            Some(Value::String(s)) => s.parse().unwrap_or_else(|_| {
                warn!(value = %s, "Invalid HTTP port, using default");
                DEFAULT_HTTP_PORT
            }),
            _ => DEFAULT_HTTP_PORT,
        }
    }
}

/// Emplacements candidats du fichier de configuration, par priorité
/// décroissante.
fn candidate_files() -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(path) = env::var(ENV_CONFIG_FILE) {
        if !path.is_empty() {
            files.push(PathBuf::from(path));
        }
    }
    files.push(PathBuf::from(".loficast.yml"));
    if let Some(home) = dirs::home_dir() {
        files.push(home.join(".loficast.yml"));
    }
    files
}

/// Fusionne `patch` dans `base`.
///
/// Deux mappings sont fusionnés clé par clé (récursivement), toute autre
/// combinaison est remplacée par le patch. Un patch `null` est neutre.
/// Les clés traversées sont normalisées en minuscules, si bien que tout
/// arbre passé par `overlay` est canonique.
fn overlay(base: Value, patch: Value) -> Value {
    match (base, patch) {
        (base, Value::Null) => base,
        (Value::Mapping(base_map), Value::Mapping(patch_map)) => {
            let mut merged = Mapping::new();
            for (key, value) in base_map {
                merged.insert(normalize_key(key), value);
            }
            for (key, patch_value) in patch_map {
                let key = normalize_key(key);
                let combined = match merged.remove(&key) {
                    Some(base_value) => overlay(base_value, patch_value),
                    None => overlay(Value::Null, patch_value),
                };
                merged.insert(key, combined);
            }
            Value::Mapping(merged)
        }
        // Normaliser aussi les sous-arbres qui remplacent un non-mapping
        (_, Value::Mapping(patch_map)) => overlay(
            Value::Mapping(Mapping::new()),
            Value::Mapping(patch_map),
        ),
        (_, patch) => patch,
    }
}

fn normalize_key(key: Value) -> Value {
    match key {
        Value::String(s) => Value::String(s.to_lowercase()),
        other => other,
    }
}

/// Emballe `value` dans des mappings imbriqués suivant `path`, clés en
/// minuscules : `nest(&["host", "http_port"], v)` donne
/// `{host: {http_port: v}}`.
fn nest(path: &[&str], value: Value) -> Value {
    path.iter().rev().fold(value, |inner, key| {
        let mut map = Mapping::new();
        map.insert(Value::String(key.to_lowercase()), inner);
        Value::Mapping(map)
    })
}

/// Construit le patch issu des variables `LOFICAST_CONFIG__SECTION__CLE`.
/// Les valeurs sont interprétées comme YAML (nombres, booléens), sinon
/// gardées comme chaînes.
fn env_overrides() -> Value {
    let mut patch = Value::Null;
    for (name, raw) in env::vars() {
        let Some(dotted) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<&str> = dotted.split("__").collect();
        if path.iter().any(|segment| segment.is_empty()) {
            continue;
        }
        let value: Value =
            serde_yaml::from_str(&raw).unwrap_or_else(|_| Value::String(raw.clone()));
        patch = overlay(patch, nest(&path, value));
    }
    patch
}

/// Un emplacement est utilisable si le fichier accepte l'écriture, ou
/// s'il n'existe pas encore dans un répertoire non verrouillé.
fn is_writable(path: &Path) -> bool {
    if path.exists() {
        return fs::OpenOptions::new().append(true).open(path).is_ok();
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::metadata(parent)
        .map(|meta| !meta.permissions().readonly())
        .unwrap_or(false)
}
