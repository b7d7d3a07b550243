// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `imgclass serve`: load the model once, then serve HTTP until stopped.

use runtime::Classifier;
use server::AppConfig;

pub async fn execute(config: AppConfig) -> anyhow::Result<()> {
    config.validate()?;
    tracing::info!("starting classification server");

    let classifier = Classifier::from_config(config.runtime.clone()).map_err(|e| {
        anyhow::anyhow!(
            "failed to load model from '{}': {e}",
            config.runtime.graph_path.display()
        )
    })?;

    server::serve(classifier, &config.server).await?;
    Ok(())
}
