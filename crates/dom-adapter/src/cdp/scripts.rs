//! Page-side snippets evaluated through `Runtime.evaluate`.
//!
//! Every snippet runs inside [`wrap`], which provides `track(obj)` to register
//! an object and get its numeric handle, `node(id)` to resolve a handle
//! (`lookup(id)` when a collected handle is not an error), and
//! reports results as `{ok, value}` / `{ok:false, error}` so that `null` and
//! exceptions survive the by-value transfer.

use serde_json::Value;

const PRELUDE: &str = r#"
const SWEEP_EVERY = 256;
const reg = (window.__niceAutofillHandles = window.__niceAutofillHandles || { map: new Map(), ids: new WeakMap(), next: 1 });
const sweep = () => {
  for (const [id, ref] of reg.map) {
    if (!ref.deref()) reg.map.delete(id);
  }
};
const track = (obj) => {
  if (obj === null || obj === undefined) return null;
  let id = reg.ids.get(obj);
  if (id === undefined) {
    id = reg.next++;
    reg.ids.set(obj, id);
    reg.map.set(id, new WeakRef(obj));
    if (id % SWEEP_EVERY === 0) sweep();
  }
  return id;
};
const lookup = (id) => {
  const ref = reg.map.get(id);
  const obj = ref && ref.deref();
  if (ref && !obj) reg.map.delete(id);
  return obj;
};
const node = (id) => {
  const obj = lookup(id);
  if (!obj) throw new Error('stale handle ' + id);
  return obj;
};
const scopeOf = (id) => (id === null || id === undefined ? document : node(id));
"#;

pub(crate) const STALE_PREFIX: &str = "stale handle ";

/// Build the expression for `body` with `args` bound as a JSON literal.
pub(crate) fn wrap(body: &str, args: &Value) -> String {
    format!(
        "(() => {{ try {{ {PRELUDE}\nconst args = {args};\nconst value = (() => {{ {body} }})();\nreturn {{ ok: true, value: value === undefined ? null : value }}; }} catch (e) {{ return {{ ok: false, error: String((e && e.message) || e) }}; }} }})()"
    )
}

pub(crate) const QUERY: &str = "return track(scopeOf(args.scope).querySelector(args.selector));";

pub(crate) const QUERY_ALL: &str =
    "return Array.from(scopeOf(args.scope).querySelectorAll(args.selector)).map(track);";

pub(crate) const BY_ID: &str = "return track(document.getElementById(args.id));";

pub(crate) const CLOSEST: &str = "return track(node(args.id).closest(args.selector));";

pub(crate) const PARENT: &str = "return track(node(args.id).parentElement);";

pub(crate) const CHILDREN: &str = "return Array.from(node(args.id).children).map(track);";

pub(crate) const BODY: &str = "return track(document.body);";

pub(crate) const DOCUMENT_ELEMENT: &str = "return track(document.documentElement);";

pub(crate) const ACTIVE: &str = "return track(document.activeElement);";

pub(crate) const IS_CONNECTED: &str =
    "const el = lookup(args.id); return !!el && !!el.isConnected;";

pub(crate) const TEXT: &str = "return node(args.id).textContent || '';";

pub(crate) const ATTRIBUTE: &str = "return node(args.id).getAttribute(args.name);";

pub(crate) const VALUE: &str = "const el = node(args.id); return el.value === undefined ? '' : String(el.value);";

pub(crate) const SET_VALUE: &str = "node(args.id).value = args.value; return null;";

pub(crate) const DESCRIBE: &str = r#"
const el = node(args.id);
const style = window.getComputedStyle ? getComputedStyle(el) : null;
return {
  tag: el.tagName,
  id: el.id || null,
  classes: el.classList ? Array.from(el.classList) : [],
  attributes: Array.from(el.attributes || []).map(a => [a.name, a.value]),
  hidden: !!style && (style.display === 'none' || style.visibility === 'hidden'),
};
"#;

pub(crate) const CLICK: &str = "node(args.id).click(); return null;";

pub(crate) const FOCUS: &str = "node(args.id).focus(); return null;";

pub(crate) const BLUR: &str = "node(args.id).blur(); return null;";

pub(crate) const DISPATCH: &str = r#"
const el = node(args.id);
const ev = args.event;
let event;
switch (ev.kind) {
  case 'input':
  case 'change':
    event = new Event(ev.kind, { bubbles: true });
    break;
  case 'scroll':
    event = new Event('scroll', { bubbles: true });
    break;
  case 'keyDown':
  case 'keyUp':
    event = new KeyboardEvent(ev.kind === 'keyDown' ? 'keydown' : 'keyup', {
      key: ev.key, code: ev.code, keyCode: ev.keyCode, which: ev.keyCode, bubbles: true, cancelable: true,
    });
    break;
  case 'mouse':
    event = new MouseEvent(ev.button, {
      bubbles: true, cancelable: true, view: window, clientX: ev.x, clientY: ev.y, button: 0,
    });
    break;
  case 'wheel':
    event = new WheelEvent('wheel', { deltaY: ev.delta_y, bubbles: true, cancelable: true });
    break;
  default:
    throw new Error('unknown event ' + ev.kind);
}
el.dispatchEvent(event);
return null;
"#;

pub(crate) const SCROLL_INTO_VIEW: &str =
    "node(args.id).scrollIntoView({ behavior: 'auto', block: args.block }); return null;";

pub(crate) const RECT: &str = r#"
const r = node(args.id).getBoundingClientRect();
return { x: r.left, y: r.top, width: r.width, height: r.height };
"#;

pub(crate) const SCROLL_METRICS: &str = r#"
const el = node(args.id);
return {
  scrollTop: el.scrollTop,
  scrollHeight: el.scrollHeight,
  clientHeight: el.clientHeight,
  overflowY: getComputedStyle(el).overflowY,
};
"#;

pub(crate) const SET_SCROLL_TOP: &str = "node(args.id).scrollTop = args.top; return null;";

pub(crate) const FRAME_DOCUMENT: &str = r#"
const frame = node(args.id);
try {
  const doc = frame.contentDocument;
  if (!doc) throw new Error('frame document unavailable');
  return { url: doc.location ? doc.location.href : (frame.src || ''), root: track(doc.documentElement) };
} catch (e) {
  return { url: frame.src || '', error: String((e && e.message) || e) };
}
"#;

pub(crate) const LOCATION: &str = "return window.location.href;";

pub(crate) const PLATFORM_AVAILABLE: &str =
    "return !!(window.cpr && window.cpr.core && window.cpr.core.Platform && window.cpr.core.Platform.INSTANCE);";

pub(crate) const PLATFORM: &str = r#"
const p = window.cpr && window.cpr.core && window.cpr.core.Platform && window.cpr.core.Platform.INSTANCE;
return p && typeof p.lookup === 'function' ? track(p) : null;
"#;

pub(crate) const APPLICATION: &str = r#"
const p = window.cpr.core.Platform.INSTANCE;
const app = p.lookup(args.appId);
return app && typeof app.lookup === 'function' ? track(app) : null;
"#;

pub(crate) const ACTIVE_APPLICATION: &str = r#"
const p = window.cpr.core.Platform.INSTANCE;
if (typeof p.getActiveApplication !== 'function') return null;
const app = p.getActiveApplication();
return app && typeof app.lookup === 'function' ? track(app) : null;
"#;

pub(crate) const LOOKUP: &str = "return track(node(args.scope).lookup(args.id));";

pub(crate) const CALL: &str = r#"
const target = node(args.target);
const result = target[args.method](...args.args);
if (result === undefined || result === null) return null;
if (typeof result !== 'object') return result;
try { return JSON.parse(JSON.stringify(result)); } catch (_) { return null; }
"#;

pub(crate) const CALL_OBJECT: &str =
    "const target = node(args.target); return track(target[args.method](...args.args));";

pub(crate) const HAS_METHOD: &str = "return typeof node(args.target)[args.method] === 'function';";

pub(crate) const SET_PROPERTY: &str = "node(args.target)[args.name] = args.value; return null;";
