//! Compiled-in table of common type and field names.
//!
//! Flattened type trees reference frequently recurring strings
//! (`"m_Name"`, `"int"`, `"PPtr<GameObject>"`, ...) by offset into a string
//! blob compiled into the engine instead of repeating them in every file.
//! The blob is a run of null-terminated strings; an entry's key is its byte
//! offset within that run, so the table below lists the strings in blob
//! order and derives each offset by accumulating `len + 1`.
//!
//! The map is initialized once on first use and never mutated, which makes
//! it safe to share across files being decoded on different threads.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Entries of the shared string blob, in blob order. Appending here is the
/// only safe edit: inserting in the middle would shift every later offset.
const ENTRIES: &[&str] = &[
    "AABB",
    "AnimationClip",
    "AnimationCurve",
    "AnimationState",
    "Array",
    "Base",
    "BitField",
    "bitset",
    "bool",
    "char",
    "ColorRGBA",
    "Component",
    "data",
    "deque",
    "double",
    "dynamic_array",
    "FastPropertyName",
    "first",
    "float",
    "Font",
    "GameObject",
    "Generic Mono",
    "GradientNEW",
    "GUID",
    "GUIStyle",
    "int",
    "list",
    "long long",
    "map",
    "Matrix4x4f",
    "MdFour",
    "MonoBehaviour",
    "MonoScript",
    "m_ByteSize",
    "m_Curve",
    "m_EditorClassIdentifier",
    "m_EditorHideFlags",
    "m_Enabled",
    "m_ExtensionPtr",
    "m_GameObject",
    "m_Index",
    "m_IsArray",
    "m_IsStatic",
    "m_MetaFlag",
    "m_Name",
    "m_ObjectHideFlags",
    "m_PrefabInternal",
    "m_PrefabParentObject",
    "m_Script",
    "m_StaticEditorFlags",
    "m_Type",
    "m_Version",
    "Object",
    "pair",
    "PPtr<Component>",
    "PPtr<GameObject>",
    "PPtr<Material>",
    "PPtr<MonoBehaviour>",
    "PPtr<MonoScript>",
    "PPtr<Object>",
    "PPtr<Prefab>",
    "PPtr<Sprite>",
    "PPtr<TextAsset>",
    "PPtr<Texture>",
    "PPtr<Texture2D>",
    "PPtr<Transform>",
    "Prefab",
    "Quaternionf",
    "Rectf",
    "RectInt",
    "RectOffset",
    "second",
    "set",
    "short",
    "size",
    "SInt16",
    "SInt32",
    "SInt64",
    "SInt8",
    "staticvector",
    "string",
    "TextAsset",
    "TextMesh",
    "Texture",
    "Texture2D",
    "Transform",
    "TypelessData",
    "UInt16",
    "UInt32",
    "UInt64",
    "UInt8",
    "unsigned int",
    "unsigned long long",
    "unsigned short",
    "vector",
    "Vec2f",
    "Vec3f",
    "Vec4f",
    "xform",
    "Vector2f",
    "Vector3f",
    "Vector4f",
    "m_ScriptingClassIdentifier",
    "Gradient",
    "Type*",
    "int2_storage",
    "int3_storage",
    "BoundsInt",
    "m_CorrespondingSourceObject",
    "m_PrefabInstance",
    "m_PrefabAsset",
    "FileSize",
    "Hash128",
];

static TABLE: LazyLock<HashMap<u32, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::with_capacity(ENTRIES.len());
    let mut offset = 0u32;
    for &s in ENTRIES {
        map.insert(offset, s);
        offset += s.len() as u32 + 1;
    }
    map
});

/// Look up a shared string by its blob offset.
pub fn common_string(offset: u32) -> Option<&'static str> {
    TABLE.get(&offset).copied()
}
