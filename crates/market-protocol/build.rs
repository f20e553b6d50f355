// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
use std::io::Result;

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=proto/sale.proto");

    // Client for the spawner, server for engines (and tests) implementing the contract
    tonic_prost_build::configure()
        .build_client(true)
        .build_server(true)
        .compile_protos(&["proto/sale.proto"], &["proto/"])?;

    Ok(())
}
