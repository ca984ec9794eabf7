//! Extension pour intégrer la radio dans lfcconfig
//!
//! Ce module fournit le trait `RadioConfigExt` qui ajoute les clés du
//! répertoire musical à `lfcconfig::Config`, avec auto-persistance des
//! valeurs par défaut.

use std::path::PathBuf;

use lfcconfig::Config;
use serde_yaml::Value;

/// Répertoire musical par défaut
pub const DEFAULT_MUSIC_DIR: &str = "./music";

/// Trait d'extension pour la configuration de la radio
///
/// # Auto-persist des valeurs par défaut
///
/// Le getter persiste automatiquement la valeur par défaut dans la
/// configuration si elle n'existe pas encore.
pub trait RadioConfigExt {
    /// Répertoire contenant les fichiers `.mp3` de la playlist
    fn get_music_dir(&self) -> PathBuf;

    /// Définit le répertoire musical
    fn set_music_dir(&self, dir: &str);
}

impl RadioConfigExt for Config {
    fn get_music_dir(&self) -> PathBuf {
        match self.get(&["radio", "music_dir"]) {
            Some(Value::String(dir)) if !dir.is_empty() => PathBuf::from(dir),
            _ => {
                self.set_music_dir(DEFAULT_MUSIC_DIR);
                PathBuf::from(DEFAULT_MUSIC_DIR)
            }
        }
    }

    fn set_music_dir(&self, dir: &str) {
        self.set(&["radio", "music_dir"], Value::String(dir.to_string()));
    }
}
