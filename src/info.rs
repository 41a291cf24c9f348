//! Prints the resolved configuration paths and a `$PATH` diagnostic, for debugging installs
//! that don't resolve on the shell's `PATH`.

use std::env;

use crate::config::Config;

pub fn info(config: &Config) {
    let bin_path = config.get_bin_path();

    println!("Config path:    {}", config.resolve_path().display());
    println!("Bin path:       {}", bin_path.display());
    println!("Opt path:       {}", config.get_opt_path().display());
    println!("Cache path:     {}", config.get_cache_path().display());
    println!("Downloads path: {}", config.get_downloads_path().display());

    let on_path = env::var_os("PATH")
        .map(|path| env::split_paths(&path).any(|p| p == bin_path))
        .unwrap_or(false);

    if on_path {
        println!("\n{} is on $PATH.", bin_path.display());
    } else {
        println!("\n{} is NOT on $PATH. Add it to use installed tools directly.", bin_path.display());
    }
}
