/*
 * lib.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Lucciola, a browser for Gemini space.
 *
 * Lucciola is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Lucciola is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Lucciola.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Lucciola core: the engine behind the UI. A Tab owns one gemini Session,
//! one History, and the currently displayed page; the gemtext module turns
//! raw responses into content blocks plus a searchable transcript; trust and
//! config persist the per-host certificate overrides and browser settings.

pub mod config;
pub mod gemtext;
pub mod history;
pub mod net;
pub mod protocol;
pub mod tab;
pub mod trust;
pub mod uri;
