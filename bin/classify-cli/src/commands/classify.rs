// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `imgclass classify`: run one image through the same path the server uses.

use runtime::Classifier;
use server::AppConfig;
use std::path::PathBuf;

pub fn execute(config: AppConfig, image: PathBuf, top: Option<usize>) -> anyhow::Result<()> {
    let classifier = Classifier::from_config(config.runtime)?;
    let result = classifier.classify(&image)?;

    let json = match top {
        Some(k) => {
            // Ranked, most probable first.
            let entries: Vec<serde_json::Value> = result
                .top_k(k)
                .into_iter()
                .map(|(label, p)| serde_json::json!({ "label": label, "probability": p }))
                .collect();
            serde_json::to_string_pretty(&entries)?
        }
        None => serde_json::to_string_pretty(&result)?,
    };
    println!("{json}");
    Ok(())
}
