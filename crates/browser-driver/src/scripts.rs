//! In-page probe scripts shared by the gate and the drivers
//!
//! Scripted pages answer these by identity instead of running them.

/// Current route path
pub const LOCATION_PATHNAME: &str = "window.location.pathname";

/// Document finished loading
pub const DOCUMENT_READY: &str = "document.readyState === 'complete'";

/// Session looks authenticated (token in storage or session cookie)
pub const AUTH_PROBE: &str = "Boolean(window.localStorage.getItem('auth_token') || window.localStorage.getItem('token') || document.cookie.includes('session'))";

/// Service health check; args: `[url]`
pub const SERVICE_PROBE: &str =
    "async (url) => { try { const res = await fetch(url, { method: 'GET' }); return res.ok; } catch (e) { return false; } }";

/// Injected application state lookup; args: `[dotted_key]`
pub const STATE_LOOKUP: &str = "(key) => key.split('.').reduce((acc, part) => (acc == null ? undefined : acc[part]), window.__APP_STATE__)";

/// Finished request with a 2xx status whose URL contains the fragment; args: `[fragment]`
pub const API_SUCCESS_PROBE: &str = "(fragment) => performance.getEntriesByType('resource').some((e) => (!fragment || e.name.includes(fragment)) && typeof e.responseStatus === 'number' && e.responseStatus >= 200 && e.responseStatus < 300)";

/// Element is rendered and visible; args: `[selector]`
pub const VISIBILITY_PROBE: &str = "(sel) => { const el = document.querySelector(sel); if (!el) return false; const style = window.getComputedStyle(el); const rect = el.getBoundingClientRect(); return style.visibility !== 'hidden' && style.display !== 'none' && rect.width > 0 && rect.height > 0; }";

/// Element is attached; args: `[selector]`
pub const QUERY_PROBE: &str = "(sel) => document.querySelector(sel) !== null";

/// Number of resource entries seen so far (used for idle detection)
pub const RESOURCE_COUNT: &str = "performance.getEntriesByType('resource').length";

/// Set a select element's value and fire change events; args: `[selector, value]`
pub const SELECT_OPTION: &str = "(sel, value) => { const el = document.querySelector(sel); if (!el) throw new Error('selector not found: ' + sel); el.value = value; el.dispatchEvent(new Event('input', { bubbles: true })); el.dispatchEvent(new Event('change', { bubbles: true })); return true; }";

/// Dispatch hover events on an element; args: `[selector]`
pub const HOVER_ELEMENT: &str = "(sel) => { const el = document.querySelector(sel); if (!el) throw new Error('selector not found: ' + sel); for (const type of ['mouseover', 'mouseenter', 'mousemove']) { el.dispatchEvent(new MouseEvent(type, { bubbles: true })); } return true; }";
