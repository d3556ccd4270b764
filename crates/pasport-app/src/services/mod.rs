// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer — bridges the command-line shell to the pasport backend crates.
//
// Commands call these methods and only format what comes back.

pub mod app_services;
