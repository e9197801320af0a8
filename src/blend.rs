use image::Rgba;
// based on https://github.com/aseprite/aseprite/blob/master/src/doc/blend_funcs.cpp

pub type Color8 = Rgba<u8>;

// based on: rgba_blender_normal(color_t backdrop, color_t src, int opacity)
pub(crate) fn normal(backdrop: Color8, src: Color8, opacity: u8) -> Color8 {
    let (back_r, back_g, back_b, back_a) = as_rgba_i32(backdrop);
    let (src_r, src_g, src_b, src_a) = as_rgba_i32(src);

    if back_a == 0 {
        let alpha = mul_un8(src_a, opacity as i32) as i32;
        return from_rgba_i32(src_r, src_g, src_b, alpha);
    } else if src_a == 0 {
        return backdrop;
    }

    let src_a = mul_un8(src_a, opacity as i32) as i32;

    let res_a = src_a + back_a - mul_un8(back_a, src_a) as i32;

    let res_r = back_r + ((src_r - back_r) * src_a) / res_a;
    let res_g = back_g + ((src_g - back_g) * src_a) / res_a;
    let res_b = back_b + ((src_b - back_b) * src_a) / res_a;

    from_rgba_i32(res_r, res_g, res_b, res_a)
}

fn as_rgba_i32(color: Color8) -> (i32, i32, i32, i32) {
    let [r, g, b, a] = color.0;
    (r as i32, g as i32, b as i32, a as i32)
}

fn from_rgba_i32(r: i32, g: i32, b: i32, a: i32) -> Color8 {
    debug_assert!(r >= 0 && r <= 255);
    debug_assert!(g >= 0 && g <= 255);
    debug_assert!(b >= 0 && b <= 255);
    debug_assert!(a >= 0 && a <= 255);
    Rgba([r as u8, g as u8, b as u8, a as u8])
}

// MUL_UN8(a, b, t) ((t) = (a) * (uint16_t)(b) + ONE_HALF, ((((t) >> G_SHIFT ) + (t) ) >> G_SHIFT ))
fn mul_un8(a: i32, b: i32) -> u8 {
    let t = a * b + 0x80;
    let r = ((t >> 8) + t) >> 8;
    r as u8
}

#[test]
fn test_normal() {
    let back = Rgba([0, 205, 249, 255]);
    let front = Rgba([237, 118, 20, 255]);
    let res = normal(back, front, 128);
    assert_eq!(Rgba([118, 162, 135, 255]), res);
}

#[test]
fn test_normal_opaque_replaces() {
    let back = Rgba([10, 20, 30, 255]);
    let front = Rgba([200, 100, 50, 255]);
    assert_eq!(normal(back, front, 255), front);
}

#[test]
fn test_normal_zero_opacity_keeps_backdrop() {
    let back = Rgba([10, 20, 30, 255]);
    let front = Rgba([200, 100, 50, 255]);
    assert_eq!(normal(back, front, 0), back);
}

#[test]
fn test_normal_over_transparent() {
    let back = Rgba([0, 0, 0, 0]);
    let front = Rgba([200, 100, 50, 200]);
    assert_eq!(normal(back, front, 255), front);
    assert_eq!(normal(back, front, 128), Rgba([200, 100, 50, 100]));
}

#[test]
fn test_mul_un8() {
    assert_eq!(mul_un8(255, 255), 255);
    assert_eq!(mul_un8(255, 0), 0);
    assert_eq!(mul_un8(200, 128), 100);
}
